// src/ingest/providers/mod.rs
pub mod forum_api;
pub mod forum_html;
pub mod headline_api;
pub mod social_search;

use std::future::Future;

use crate::error::SourceError;
use crate::ingest::types::Record;

/// One decoded page of a paginated source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Total number of pages the source reports.
    pub page_count: u32,
    pub entries: Vec<Record>,
}

/// Collect the last two pages of a paginated source.
///
/// Page 1 is fetched to learn the page count. The previous and last pages are
/// then fetched together, concatenated previous-then-last and reversed as a
/// whole, so the result does not depend on which response lands first.
pub async fn last_two_pages<F, Fut>(fetch: F) -> Result<Vec<Record>, SourceError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<Page, SourceError>>,
{
    let first = fetch(1).await?;
    let last_num = first.page_count;

    let (prev, last) = match last_num {
        0 | 1 => (Vec::new(), first.entries),
        2 => {
            let last = fetch(2).await?;
            (first.entries, last.entries)
        }
        n => {
            let (prev, last) = tokio::try_join!(fetch(n - 1), fetch(n))?;
            (prev.entries, last.entries)
        }
    };

    let mut entries = prev;
    entries.extend(last);
    entries.reverse();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn rec(id: &str) -> Record {
        Record {
            url: format!("https://forum.example/entry/{id}"),
            text: id.to_string(),
            date: 0,
            author: String::new(),
        }
    }

    fn ids(v: &[Record]) -> Vec<&str> {
        v.iter().map(|r| r.text.as_str()).collect()
    }

    #[tokio::test]
    async fn previous_and_last_pages_join_then_reverse() {
        let seen = Mutex::new(Vec::new());
        let out = last_two_pages(|n| {
            seen.lock().unwrap().push(n);
            async move {
                let entries = match n {
                    1 => vec![rec("x")],
                    4 => vec![rec("B"), rec("A")],
                    5 => vec![rec("D"), rec("C")],
                    _ => unreachable!("page {n}"),
                };
                Ok(Page { page_count: 5, entries })
            }
        })
        .await
        .unwrap();

        assert_eq!(ids(&out), vec!["C", "D", "A", "B"]);
        assert_eq!(*seen.lock().unwrap(), vec![1, 4, 5]);
    }

    #[tokio::test]
    async fn order_ignores_response_timing() {
        // Last page answers first; the previous page is slow.
        let out = last_two_pages(|n| async move {
            let (delay, entries) = match n {
                1 => (0, vec![]),
                2 => (30, vec![rec("B"), rec("A")]),
                3 => (0, vec![rec("D"), rec("C")]),
                _ => unreachable!(),
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(Page { page_count: 3, entries })
        })
        .await
        .unwrap();
        assert_eq!(ids(&out), vec!["C", "D", "A", "B"]);
    }

    #[tokio::test]
    async fn single_page_is_reused() {
        let calls = Mutex::new(0);
        let out = last_two_pages(|_| {
            *calls.lock().unwrap() += 1;
            async { Ok(Page { page_count: 1, entries: vec![rec("b"), rec("a")] }) }
        })
        .await
        .unwrap();
        assert_eq!(ids(&out), vec!["a", "b"]);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn two_pages_reuse_first_page_as_previous() {
        let out = last_two_pages(|n| async move {
            let entries = if n == 1 { vec![rec("B"), rec("A")] } else { vec![rec("C")] };
            Ok(Page { page_count: 2, entries })
        })
        .await
        .unwrap();
        assert_eq!(ids(&out), vec!["C", "A", "B"]);
    }

    #[tokio::test]
    async fn failing_page_fails_the_collect() {
        let res = last_two_pages(|n| async move {
            if n == 6 {
                return Err(SourceError::Parse(crate::error::ParseError::markup("boom")));
            }
            Ok(Page { page_count: 6, entries: vec![] })
        })
        .await;
        assert!(matches!(res, Err(SourceError::Parse(_))));
    }
}
