//! Continuation-token pagination as a lazy stream.
//!
//! [`pages`] drives a page fetcher until a page arrives without a
//! continuation token; [`paginate`] flattens those pages into items.
//! Nothing is requested until the stream is polled, and the first error
//! ends the stream.

use std::future::Future;

use futures_util::stream::{self, Stream, TryStreamExt};

use crate::error::{ProviderError, ProviderResult};

/// One page of a list response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Token for the next page, `None` on the last page.
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    /// Creates a final page.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }

    /// Creates a page followed by another one.
    pub fn with_next(items: Vec<T>, token: impl Into<String>) -> Self {
        Self {
            items,
            next_page_token: Some(token.into()),
        }
    }
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Streams pages produced by `fetch`, chaining continuation tokens.
///
/// `fetch` receives `None` for the first page and the previous page's token
/// afterwards. An empty token is treated as the end of the listing.
pub fn pages<'a, T, F, Fut>(mut fetch: F) -> impl Stream<Item = ProviderResult<Page<T>>> + 'a
where
    T: 'a,
    F: FnMut(Option<String>) -> Fut + 'a,
    Fut: Future<Output = ProviderResult<Page<T>>> + 'a,
{
    stream::try_unfold(Cursor::Start, move |cursor| {
        let request = match cursor {
            Cursor::Start => Some(fetch(None)),
            Cursor::Next(token) => Some(fetch(Some(token))),
            Cursor::Done => None,
        };

        async move {
            let Some(request) = request else {
                return Ok::<_, ProviderError>(None);
            };
            let page = request.await?;
            let next = match page.next_page_token.as_deref() {
                Some(token) if !token.is_empty() => Cursor::Next(token.to_string()),
                _ => Cursor::Done,
            };
            Ok(Some((page, next)))
        }
    })
}

/// Streams every item of every page produced by `fetch`, in order.
pub fn paginate<'a, T, F, Fut>(fetch: F) -> impl Stream<Item = ProviderResult<T>> + 'a
where
    T: 'a,
    F: FnMut(Option<String>) -> Fut + 'a,
    Fut: Future<Output = ProviderResult<Page<T>>> + 'a,
{
    pages(fetch)
        .map_ok(|page| stream::iter(page.items.into_iter().map(Ok::<T, ProviderError>)))
        .try_flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use futures_util::future;
    use futures_util::stream::StreamExt;

    /// Serves pre-split pages keyed by token and records requested tokens.
    struct PagedList {
        pages: Vec<Page<u32>>,
        requested: Mutex<Vec<Option<String>>>,
    }

    impl PagedList {
        fn split(items: &[u32], sizes: &[usize]) -> Self {
            let mut pages = Vec::new();
            let mut offset = 0;
            for (i, size) in sizes.iter().enumerate() {
                let chunk = items[offset..offset + size].to_vec();
                offset += size;
                if i + 1 == sizes.len() {
                    pages.push(Page::last(chunk));
                } else {
                    pages.push(Page::with_next(chunk, format!("page-{}", i + 1)));
                }
            }
            Self {
                pages,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn fetch(&self, token: Option<String>) -> future::Ready<ProviderResult<Page<u32>>> {
            let index = match token.as_deref() {
                None => 0,
                Some(t) => t.trim_start_matches("page-").parse().unwrap(),
            };
            self.requested.lock().unwrap().push(token);
            future::ready(Ok(self.pages[index].clone()))
        }
    }

    #[tokio::test]
    async fn split_pages_match_single_page() {
        let items = [1, 2, 3, 4, 5];

        let single = PagedList::split(&items, &[5]);
        let split = PagedList::split(&items, &[2, 2, 1]);

        let from_single: Vec<u32> = paginate(|t| single.fetch(t)).try_collect().await.unwrap();
        let from_split: Vec<u32> = paginate(|t| split.fetch(t)).try_collect().await.unwrap();

        assert_eq!(from_single, items);
        assert_eq!(from_split, from_single);
        assert_eq!(
            *split.requested.lock().unwrap(),
            vec![None, Some("page-1".to_string()), Some("page-2".to_string())]
        );
    }

    #[tokio::test]
    async fn pages_are_fetched_lazily() {
        let list = PagedList::split(&[1, 2, 3, 4], &[2, 2]);
        {
            let stream = pages(|t| list.fetch(t));
            let mut stream = std::pin::pin!(stream);
            let first = stream.next().await.unwrap().unwrap();
            assert_eq!(first.items, vec![1, 2]);
        }
        assert_eq!(list.requested.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_listing_yields_nothing() {
        let items: Vec<u32> = paginate(|_| future::ready(Ok(Page::last(Vec::<u32>::new()))))
            .try_collect()
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn empty_token_ends_listing() {
        let mut calls = 0;
        let items: Vec<u32> = paginate(|_| {
            calls += 1;
            future::ready(Ok(Page::with_next(vec![7], "")))
        })
        .try_collect()
        .await
        .unwrap();
        assert_eq!(items, vec![7]);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn error_stops_the_stream() {
        let mut calls = 0;
        let result: ProviderResult<Vec<u32>> = paginate(|token| {
            calls += 1;
            future::ready(match token {
                None => Ok(Page::with_next(vec![1], "next")),
                Some(_) => Err(ProviderError::network("connection reset")),
            })
        })
        .try_collect()
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::NetworkError);
        assert_eq!(calls, 2);
    }
}
