use std::cell::RefCell;
use std::collections::HashMap;

use crate::site::fetch_bytes;

type Waiter<T> = Box<dyn FnOnce(T)>;

/// Decoded images by URL. Requests for a URL that is already on its way
/// queue behind the first one instead of fetching again.
pub struct ArtCache<T> {
    ready: HashMap<String, T>,
    pending: HashMap<String, Vec<Waiter<T>>>,
}

impl<T> Default for ArtCache<T> {
    fn default() -> Self {
        Self {
            ready: HashMap::new(),
            pending: HashMap::new(),
        }
    }
}

impl<T: Clone + 'static> ArtCache<T> {
    /// Hands a cached value straight to `apply`. Otherwise queues `apply` and
    /// returns true when the caller has to start the fetch.
    pub fn request(&mut self, url: &str, apply: impl FnOnce(T) + 'static) -> bool {
        if let Some(value) = self.ready.get(url) {
            apply(value.clone());
            return false;
        }
        match self.pending.get_mut(url) {
            Some(waiters) => {
                waiters.push(Box::new(apply));
                false
            }
            None => {
                self.pending.insert(url.to_string(), vec![Box::new(apply)]);
                true
            }
        }
    }

    /// Stores the value and returns everyone who was waiting for it.
    pub fn fulfill(&mut self, url: &str, value: T) -> Vec<Waiter<T>> {
        self.ready.insert(url.to_string(), value);
        self.pending.remove(url).unwrap_or_default()
    }

    /// Forgets the waiters; the next request tries again.
    pub fn fail(&mut self, url: &str) {
        self.pending.remove(url);
    }
}

thread_local! {
    static TEXTURES: RefCell<ArtCache<gtk4::gdk::Texture>> = RefCell::new(ArtCache::default());
}

/// Fetch `url` on the async runtime and hand the decoded texture to `apply`
/// on the main loop. Each URL is downloaded once per run. Failures leave the
/// placeholder in place.
pub fn load(url: &str, apply: impl FnOnce(gtk4::gdk::Texture) + 'static) {
    if url.is_empty() {
        return;
    }
    if !TEXTURES.with(|cache| cache.borrow_mut().request(url, apply)) {
        return;
    }

    let url = url.to_string();
    let fetch = {
        let url = url.clone();
        relm4::spawn(async move { fetch_bytes(&url).await })
    };

    relm4::spawn_local(async move {
        let bytes = match fetch.await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                tracing::debug!(%url, error = %e, "image fetch failed");
                TEXTURES.with(|cache| cache.borrow_mut().fail(&url));
                return;
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "image task aborted");
                TEXTURES.with(|cache| cache.borrow_mut().fail(&url));
                return;
            }
        };
        match gtk4::gdk::Texture::from_bytes(&gtk4::glib::Bytes::from_owned(bytes)) {
            Ok(texture) => {
                let waiters = TEXTURES.with(|cache| cache.borrow_mut().fulfill(&url, texture.clone()));
                for apply in waiters {
                    apply(texture.clone());
                }
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "image not decodable");
                TEXTURES.with(|cache| cache.borrow_mut().fail(&url));
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&'static str) -> Box<dyn FnOnce(String)>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let make = move |who: &'static str| -> Box<dyn FnOnce(String)> {
            let log = log.clone();
            Box::new(move |v: String| log.borrow_mut().push(format!("{who}:{v}")))
        };
        (seen, make)
    }

    #[test]
    fn test_second_request_waits_for_first_fetch() {
        let (seen, make) = recorder();
        let mut cache: ArtCache<String> = ArtCache::default();

        assert!(cache.request("a.jpg", make("row1")));
        assert!(!cache.request("a.jpg", make("row1-rebuilt")));
        assert!(seen.borrow().is_empty());

        for apply in cache.fulfill("a.jpg", "A".to_string()) {
            apply("A".to_string());
        }
        assert_eq!(*seen.borrow(), ["row1:A", "row1-rebuilt:A"]);
    }

    #[test]
    fn test_cached_art_is_applied_without_fetch() {
        let (seen, make) = recorder();
        let mut cache: ArtCache<String> = ArtCache::default();
        assert!(cache.request("a.jpg", make("first")));
        cache.fulfill("a.jpg", "A".to_string());

        // A rerender after a playback change asks again.
        assert!(!cache.request("a.jpg", make("again")));
        assert_eq!(*seen.borrow(), ["again:A"]);
    }

    #[test]
    fn test_failed_fetch_is_retried() {
        let (seen, make) = recorder();
        let mut cache: ArtCache<String> = ArtCache::default();
        assert!(cache.request("b.jpg", make("first")));
        cache.fail("b.jpg");
        assert!(cache.request("b.jpg", make("retry")));
        assert!(seen.borrow().is_empty());
    }
}
