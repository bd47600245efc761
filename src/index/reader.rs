//! Index querying utilities.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::index::format::Index;

/// Parse an archive date such as `"Feb 11, 2011"`.
pub fn parse_message_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%b %d, %Y").ok()
}

/// Return the date range (oldest, newest) across messages with parseable dates.
pub fn date_range(index: &Index) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = index
        .iter()
        .filter_map(|(_, m)| parse_message_date(&m.metadata.date));
    let first = dates.next()?;
    let (mut min, mut max) = (first, first);
    for d in dates {
        if d < min {
            min = d;
        }
        if d > max {
            max = d;
        }
    }
    Some((min, max))
}

/// Number of images the downloader marked as below the size floor.
pub fn count_too_small(index: &Index) -> usize {
    index
        .iter()
        .flat_map(|(_, m)| m.images.iter())
        .filter(|i| i.too_small)
        .count()
}

/// Sum of recorded sizes of images that were not flagged too small.
pub fn total_known_bytes(index: &Index) -> u64 {
    index
        .iter()
        .flat_map(|(_, m)| m.images.iter())
        .filter(|i| !i.too_small)
        .filter_map(|i| i.size_bytes)
        .sum()
}

/// Number of images with no size recorded yet.
pub fn count_unsized(index: &Index) -> usize {
    index
        .iter()
        .flat_map(|(_, m)| m.images.iter())
        .filter(|i| i.size_bytes.is_none())
        .count()
}

/// Return the top N authors by message count.
pub fn top_authors(index: &Index, n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for (_, message) in index.iter() {
        let author = message.metadata.author.trim();
        if author.is_empty() {
            continue;
        }
        *counts.entry(author.to_string()).or_default() += 1;
    }
    sorted_top(counts, n)
}

/// Return the top N keywords by number of images carrying them.
pub fn top_keywords(index: &Index, n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for image in index.iter().flat_map(|(_, m)| m.images.iter()) {
        for keyword in &image.keywords {
            *counts.entry(keyword.clone()).or_default() += 1;
        }
    }
    sorted_top(counts, n)
}

/// Descending by count, ties broken alphabetically so output is stable.
fn sorted_top(counts: HashMap<String, usize>, n: usize) -> Vec<(String, usize)> {
    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::image::ImageRecord;
    use crate::model::message::{MessageMetadata, MessageRecord};

    fn message(id: &str, author: &str, date: &str, keywords: &[&[&str]]) -> MessageRecord {
        let images = keywords
            .iter()
            .enumerate()
            .map(|(i, kws)| {
                ImageRecord::new(
                    format!("https://example.com/{id}/{i}.jpg"),
                    format!("0.{i}"),
                    format!("{i}.jpg"),
                    format!("{id}_part0_{i}_{i}.jpg"),
                    kws.iter().map(|k| k.to_string()).collect(),
                )
            })
            .collect();
        MessageRecord::new(
            MessageMetadata {
                message_id: id.into(),
                subject: String::new(),
                author: author.into(),
                date: date.into(),
            },
            images,
        )
    }

    #[test]
    fn test_parse_message_date() {
        assert_eq!(
            parse_message_date("Feb 11, 2011"),
            NaiveDate::from_ymd_opt(2011, 2, 11)
        );
        assert_eq!(parse_message_date(""), None);
        assert_eq!(parse_message_date("yesterday"), None);
    }

    #[test]
    fn test_date_range_skips_unparseable() {
        let index: Index = vec![
            message("a", "x", "Mar 3, 2009", &[]),
            message("b", "x", "garbage", &[]),
            message("c", "x", "Jan 20, 2014", &[]),
        ]
        .into_iter()
        .collect();
        let (min, max) = date_range(&index).unwrap();
        assert_eq!(min, NaiveDate::from_ymd_opt(2009, 3, 3).unwrap());
        assert_eq!(max, NaiveDate::from_ymd_opt(2014, 1, 20).unwrap());
    }

    #[test]
    fn test_top_keywords_counts_images() {
        let index: Index = vec![
            message("a", "ann", "", &[&["wing", "spar"], &["wing"]]),
            message("b", "bob", "", &[&["canard"]]),
        ]
        .into_iter()
        .collect();
        let top = top_keywords(&index, 2);
        assert_eq!(top[0], ("wing".to_string(), 2));
        assert_eq!(top[1], ("canard".to_string(), 1));
    }

    #[test]
    fn test_top_authors_ignores_blank() {
        let index: Index = vec![
            message("a", "ann", "", &[]),
            message("b", "", "", &[]),
            message("c", "ann", "", &[]),
        ]
        .into_iter()
        .collect();
        assert_eq!(top_authors(&index, 5), vec![("ann".to_string(), 2)]);
    }
}
