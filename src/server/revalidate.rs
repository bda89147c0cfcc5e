//! Per-slug page cache with a revalidation window
//!
//! A page is served from memory until it is older than the window. The
//! first request for an absent or stale page receives a [`Claim`] and must
//! resolve it; while that resolution is in flight, other requests get the
//! stale page if one exists and a loading placeholder otherwise.
//!
//! A claim that is dropped without an outcome (failed resolution, client
//! gone, panic) releases the slot: a pending entry is removed and a stale
//! page goes back to being served and refreshed on the next request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Slot {
    /// First resolution in flight
    Pending,
    Ready {
        html: Arc<str>,
        at: Instant,
        refreshing: bool,
    },
    /// The CMS has no such post
    Missing { at: Instant },
}

/// What a request for a slug should do
#[derive(Debug)]
pub enum Lookup<'a> {
    /// Serve this page
    Page(Arc<str>),
    /// Serve the not-found page
    Missing,
    /// Another request is resolving; serve the placeholder
    Pending,
    /// This request must resolve the slug and report through the claim
    Resolve(Claim<'a>),
}

/// Exclusive right to resolve one slug
///
/// Report the outcome with [`store`](Self::store),
/// [`store_missing`](Self::store_missing) or [`fail`](Self::fail).
/// Dropping it unreported behaves like `fail`.
#[derive(Debug)]
pub struct Claim<'a> {
    cache: &'a RenderCache,
    slug: String,
    settled: bool,
}

impl Claim<'_> {
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Record a rendered page
    pub fn store(mut self, html: Arc<str>) {
        self.cache.seed(&self.slug, html, Duration::ZERO);
        self.settled = true;
    }

    /// Record that the slug does not exist
    pub fn store_missing(mut self) {
        self.cache.slots().insert(
            self.slug.clone(),
            Slot::Missing { at: Instant::now() },
        );
        self.settled = true;
    }

    /// Give up on this resolution
    ///
    /// Returns the stale page when there is one; it stays cached and the
    /// next request past the window tries again.
    pub fn fail(mut self) -> Option<Arc<str>> {
        self.settled = true;
        self.cache.release(&self.slug)
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!("Resolution of {:?} abandoned", self.slug);
            self.cache.release(&self.slug);
        }
    }
}

/// Revalidating page cache keyed by slug
#[derive(Debug)]
pub struct RenderCache {
    window: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

impl RenderCache {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_fresh(&self, at: Instant) -> bool {
        at.elapsed() < self.window
    }

    fn claim(&self, slug: &str) -> Lookup<'_> {
        Lookup::Resolve(Claim {
            cache: self,
            slug: slug.to_string(),
            settled: false,
        })
    }

    /// Decide how to answer a request for `slug`, claiming the resolution
    /// when nobody else holds it
    pub fn lookup(&self, slug: &str) -> Lookup<'_> {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(slug) else {
            slots.insert(slug.to_string(), Slot::Pending);
            return self.claim(slug);
        };

        match slot {
            Slot::Pending => Lookup::Pending,
            Slot::Ready { html, at, .. } if self.is_fresh(*at) => Lookup::Page(html.clone()),
            Slot::Ready {
                html,
                refreshing: true,
                ..
            } => Lookup::Page(html.clone()),
            Slot::Ready { refreshing, .. } => {
                *refreshing = true;
                self.claim(slug)
            }
            Slot::Missing { at } if self.is_fresh(*at) => Lookup::Missing,
            Slot::Missing { .. } => {
                *slot = Slot::Pending;
                self.claim(slug)
            }
        }
    }

    /// Record a page that was rendered `age` ago (e.g. a pre-rendered file)
    pub fn seed(&self, slug: &str, html: Arc<str>, age: Duration) {
        let at = Instant::now().checked_sub(age).unwrap_or_else(Instant::now);
        self.slots().insert(
            slug.to_string(),
            Slot::Ready {
                html,
                at,
                refreshing: false,
            },
        );
    }

    /// Undo a claim: drop a pending entry, keep a stale page
    fn release(&self, slug: &str) -> Option<Arc<str>> {
        let mut slots = self.slots();
        match slots.get_mut(slug) {
            Some(Slot::Ready {
                html, refreshing, ..
            }) => {
                *refreshing = false;
                Some(html.clone())
            }
            Some(Slot::Pending) => {
                slots.remove(slug);
                None
            }
            _ => None,
        }
    }
}
