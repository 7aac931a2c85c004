//! Path partition followed by digest-based move detection

use super::{ChangeSet, ModifiedFile, MovedFile};
use crate::hasher::{Digest, HashAlgorithm};
use crate::snapshot::{FileRecord, Snapshot};
use std::collections::{BTreeMap, BTreeSet};

type ContentKey<'a> = (HashAlgorithm, &'a Digest);

/// Largest `deleted × added` group ranked pair by pair
pub const EXHAUSTIVE_PAIR_LIMIT: usize = 4096;

/// Classify every difference between `baseline` and `current`.
///
/// Paths only in `current` are added, paths only in `baseline` are deleted,
/// shared paths with different content are modified. Added and deleted
/// records with identical content are then paired into moves:
///
/// * one deleted and one added record with the same digest form a move;
/// * when several records share a digest on either side, candidate pairs are
///   ranked by size difference, then absolute mtime difference, then old
///   path, then new path, and taken greedily so each record is used once.
///   Groups with more than [`EXHAUSTIVE_PAIR_LIMIT`] candidate pairs skip the
///   ranking: each side is sorted by size, mtime and path and the two are
///   zipped. Leftovers stay added or deleted.
///
/// Every output sequence is sorted by path (`moved` by old path, then new).
pub fn diff(baseline: &Snapshot, current: &Snapshot) -> ChangeSet {
    let mut added: Vec<&FileRecord> = Vec::new();
    let mut deleted: Vec<&FileRecord> = Vec::new();
    let mut modified = Vec::new();

    for (path, after) in current.files() {
        match baseline.get(path) {
            None => added.push(after),
            Some(before) if !before.same_content(after) => {
                modified.push(ModifiedFile { before: before.clone(), after: after.clone() })
            }
            Some(_) => {}
        }
    }
    for (path, before) in baseline.files() {
        if !current.contains(path) {
            deleted.push(before);
        }
    }

    let moves = detect_moves(&deleted, &added);

    let moved_from: BTreeSet<&str> = moves.iter().map(|&(from, _)| from.path.as_str()).collect();
    let moved_to: BTreeSet<&str> = moves.iter().map(|&(_, to)| to.path.as_str()).collect();

    let mut moved: Vec<MovedFile> = moves
        .into_iter()
        .map(|(from, to)| MovedFile { from: from.clone(), to: to.clone() })
        .collect();
    moved.sort_by(|a, b| (a.old_path(), a.new_path()).cmp(&(b.old_path(), b.new_path())));

    // Both snapshot maps iterate in path order, so the remaining vectors are sorted already.
    ChangeSet {
        added: added
            .into_iter()
            .filter(|r| !moved_to.contains(r.path.as_str()))
            .cloned()
            .collect(),
        deleted: deleted
            .into_iter()
            .filter(|r| !moved_from.contains(r.path.as_str()))
            .cloned()
            .collect(),
        modified,
        moved,
    }
}

fn group_by_content<'a>(
    records: &[&'a FileRecord],
) -> BTreeMap<ContentKey<'a>, Vec<&'a FileRecord>> {
    let mut groups: BTreeMap<ContentKey<'a>, Vec<&'a FileRecord>> = BTreeMap::new();
    for &record in records {
        groups.entry((record.algorithm, &record.digest)).or_default().push(record);
    }
    groups
}

fn detect_moves<'a>(
    deleted: &[&'a FileRecord],
    added: &[&'a FileRecord],
) -> Vec<(&'a FileRecord, &'a FileRecord)> {
    let deleted_by_content = group_by_content(deleted);
    let added_by_content = group_by_content(added);

    let mut moves = Vec::new();
    for (key, olds) in &deleted_by_content {
        let Some(news) = added_by_content.get(key) else {
            continue;
        };

        if let ([old], [new]) = (olds.as_slice(), news.as_slice()) {
            moves.push((*old, *new));
        } else {
            moves.extend(pair_ambiguous(olds, news));
        }
    }
    moves
}

/// Greedy pairing for digests shared by several records on either side.
fn pair_ambiguous<'a>(
    olds: &[&'a FileRecord],
    news: &[&'a FileRecord],
) -> Vec<(&'a FileRecord, &'a FileRecord)> {
    if olds.len().saturating_mul(news.len()) > EXHAUSTIVE_PAIR_LIMIT {
        return pair_in_rank_order(olds, news);
    }

    let mut candidates: Vec<(&FileRecord, &FileRecord)> =
        olds.iter().flat_map(|old| news.iter().map(move |new| (*old, *new))).collect();

    candidates.sort_by(|(o1, n1), (o2, n2)| {
        let rank = |old: &FileRecord, new: &FileRecord| {
            (old.size.abs_diff(new.size), (new.modified - old.modified).abs())
        };
        rank(o1, n1)
            .cmp(&rank(o2, n2))
            .then_with(|| o1.path.cmp(&o2.path))
            .then_with(|| n1.path.cmp(&n2.path))
    });

    let mut used_old = BTreeSet::new();
    let mut used_new = BTreeSet::new();
    let mut pairs = Vec::new();

    for (old, new) in candidates {
        if used_old.contains(old.path.as_str()) || used_new.contains(new.path.as_str()) {
            continue;
        }
        used_old.insert(old.path.as_str());
        used_new.insert(new.path.as_str());
        pairs.push((old, new));
    }
    pairs
}

/// Linear-size pairing for large groups such as a renamed directory of empty files
fn pair_in_rank_order<'a>(
    olds: &[&'a FileRecord],
    news: &[&'a FileRecord],
) -> Vec<(&'a FileRecord, &'a FileRecord)> {
    let by_rank = |a: &&FileRecord, b: &&FileRecord| {
        (a.size, a.modified, &a.path).cmp(&(b.size, b.modified, &b.path))
    };

    let mut olds = olds.to_vec();
    let mut news = news.to_vec();
    olds.sort_by(by_rank);
    news.sort_by(by_rank);
    olds.into_iter().zip(news).collect()
}
