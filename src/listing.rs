//! Single-page object listing.
//!
//! [`list_page`] makes exactly one backend call. Callers that want more than
//! one page pass the returned `next_token` back in; nothing is aggregated,
//! cached or re-sorted here, so each page is an ordered slice of the keyspace.

use crate::models::{ListingPage, ObjectEntry, PrefixEntry};
use crate::storage::{ListRequest, ObjectStore, RawListing, UrlTemplate};
use crate::{Error, Result};
use tracing::debug;

pub const DEFAULT_MAX_KEYS: u32 = 1000;
pub const DEFAULT_DELIMITER: &str = "/";

/// Fetch one page and shape it into a [`ListingPage`].
pub async fn list_page(
    store: &dyn ObjectStore,
    urls: &UrlTemplate,
    request: &ListRequest,
) -> Result<ListingPage> {
    if request.max_keys == 0 {
        return Err(Error::InvalidArgument(
            "max_keys must be at least 1".to_string(),
        ));
    }

    let raw = store.list_objects_page(request).await?;
    debug!(
        "Listed {} objects and {} prefixes under {:?} (truncated: {})",
        raw.objects.len(),
        raw.common_prefixes.len(),
        request.prefix,
        raw.is_truncated
    );

    Ok(into_page(raw, urls, request.delimiter.is_some()))
}

fn into_page(raw: RawListing, urls: &UrlTemplate, grouped: bool) -> ListingPage {
    let objects = raw
        .objects
        .into_iter()
        .map(|obj| ObjectEntry {
            url: urls.url_for(&obj.key),
            key: obj.key,
            size_bytes: obj.size,
            last_modified: obj.last_modified,
        })
        .collect();

    // Without a delimiter there is no grouping, whatever the backend sent.
    let prefixes = if grouped {
        raw.common_prefixes
            .into_iter()
            .map(|prefix| PrefixEntry { prefix })
            .collect()
    } else {
        Vec::new()
    };

    ListingPage {
        objects,
        prefixes,
        is_truncated: raw.is_truncated,
        next_token: raw.next_token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::storage::{MockObjectStore, RawObject};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn urls() -> UrlTemplate {
        UrlTemplate::from_config(&StorageConfig {
            bucket: "media".to_string(),
            endpoint: None,
            region: "us-east-1".to_string(),
            access_key: None,
            secret_key: None,
        })
    }

    fn populated_store() -> MockObjectStore {
        let mut store = MockObjectStore::new();
        for i in 0..23 {
            store = store.with_file(&format!("img/{:03}.png", i), vec![0; i]);
        }
        for dir in ["img/a/", "img/b/", "img/c/"] {
            store = store
                .with_file(&format!("{}one.webp", dir), vec![1])
                .with_file(&format!("{}two.webp", dir), vec![2]);
        }
        store
    }

    /// Backend that answers every list call with the same canned page.
    struct ScriptedStore {
        page: RawListing,
    }

    #[async_trait]
    impl ObjectStore for ScriptedStore {
        async fn put_object(&self, _key: &str, _data: &[u8], _content_type: &str) -> Result<()> {
            Ok(())
        }
        async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
            Err(Error::backend("get_object", key, "unsupported"))
        }
        async fn copy_object(&self, _source_key: &str, _target_key: &str) -> Result<()> {
            Ok(())
        }
        async fn delete_object(&self, _key: &str) -> Result<()> {
            Ok(())
        }
        async fn list_objects_page(&self, _request: &ListRequest) -> Result<RawListing> {
            Ok(self.page.clone())
        }
    }

    #[tokio::test]
    async fn test_page_urls_are_templated() {
        let store = MockObjectStore::new().with_file("cats/tom.webp", vec![0; 2048]);
        let page = list_page(&store, &urls(), &ListRequest::new(10))
            .await
            .unwrap();

        assert_eq!(page.objects.len(), 1);
        let obj = &page.objects[0];
        assert_eq!(obj.key, "cats/tom.webp");
        assert_eq!(obj.size_bytes, 2048);
        assert!(obj.last_modified.is_some());
        assert_eq!(
            obj.url,
            "https://media.s3.us-east-1.amazonaws.com/cats/tom.webp"
        );
    }

    #[tokio::test]
    async fn test_backend_order_is_preserved() {
        let store = ScriptedStore {
            page: RawListing {
                objects: vec![
                    RawObject {
                        key: "zeta.png".to_string(),
                        size: 1,
                        last_modified: None,
                    },
                    RawObject {
                        key: "alpha.png".to_string(),
                        size: 2,
                        last_modified: None,
                    },
                ],
                common_prefixes: vec!["y/".to_string(), "b/".to_string()],
                is_truncated: true,
                next_token: Some("opaque-token".to_string()),
            },
        };

        let page = list_page(&store, &urls(), &ListRequest::new(2).with_delimiter("/"))
            .await
            .unwrap();

        let keys: Vec<&str> = page.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["zeta.png", "alpha.png"]);
        let prefixes: Vec<&str> = page.prefixes.iter().map(|p| p.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["y/", "b/"]);
        assert!(page.is_truncated);
        assert_eq!(page.next_token.as_deref(), Some("opaque-token"));
    }

    #[tokio::test]
    async fn test_recursive_listing_has_no_prefixes() {
        let store = ScriptedStore {
            page: RawListing {
                common_prefixes: vec!["stray/".to_string()],
                ..RawListing::default()
            },
        };
        let page = list_page(&store, &urls(), &ListRequest::new(5))
            .await
            .unwrap();
        assert!(page.prefixes.is_empty());
    }

    #[tokio::test]
    async fn test_zero_max_keys_rejected() {
        let store = MockObjectStore::new();
        let err = list_page(&store, &urls(), &ListRequest::new(0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(store.get_list_count(), 0);
    }

    #[tokio::test]
    async fn test_following_tokens_matches_single_listing() {
        let store = populated_store();

        for delimiter in [None, Some("/")] {
            let mut base = ListRequest::new(10_000).with_prefix("img/");
            base.delimiter = delimiter.map(str::to_string);
            let full = list_page(&store, &urls(), &base).await.unwrap();
            assert!(!full.is_truncated);

            for page_size in [1, 4, 7, 1000] {
                let mut seen_keys = Vec::new();
                let mut seen_prefixes = Vec::new();
                let mut token = None;
                loop {
                    let mut request = base.clone().with_token(token.take());
                    request.max_keys = page_size;
                    let page = list_page(&store, &urls(), &request).await.unwrap();
                    assert!(page.objects.len() + page.prefixes.len() <= page_size as usize);
                    seen_keys.extend(page.objects.into_iter().map(|o| o.key));
                    seen_prefixes.extend(page.prefixes.into_iter().map(|p| p.prefix));
                    if !page.is_truncated {
                        break;
                    }
                    token = page.next_token;
                    assert!(token.is_some());
                }

                let unique: BTreeSet<&String> = seen_keys.iter().collect();
                assert_eq!(unique.len(), seen_keys.len(), "duplicate keys");
                let expected: Vec<String> = full.objects.iter().map(|o| o.key.clone()).collect();
                assert_eq!(seen_keys, expected);
                let expected: Vec<String> =
                    full.prefixes.iter().map(|p| p.prefix.clone()).collect();
                assert_eq!(seen_prefixes, expected);
            }
        }
    }
}
