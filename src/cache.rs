//! Query cache keyed by logical resource name.
//!
//! Each caller session owns one `QueryCache`. Reads go through
//! `get_or_fetch`, which serves fresh entries and collapses concurrent fetches
//! of the same key into one backend call. Mutations never write to the cache;
//! on success they drop the resources listed in `Mutation::invalidates`.

use dashmap::DashMap;
use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Named cache buckets, one per backend read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    CallerUserRole,
    IsCallerAdmin,
    CallerUserProfile,
    Hotels,
    CallerHotelProfile,
    Rooms,
    Bookings,
    InviteTokens,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::CallerUserRole,
        Resource::IsCallerAdmin,
        Resource::CallerUserProfile,
        Resource::Hotels,
        Resource::CallerHotelProfile,
        Resource::Rooms,
        Resource::Bookings,
        Resource::InviteTokens,
    ];

    /// Everything the access gate reads
    pub const PERMISSIONS: [Resource; 3] = [
        Resource::CallerUserRole,
        Resource::IsCallerAdmin,
        Resource::CallerHotelProfile,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Resource::CallerUserRole => "callerUserRole",
            Resource::IsCallerAdmin => "isCallerAdmin",
            Resource::CallerUserProfile => "callerUserProfile",
            Resource::Hotels => "hotels",
            Resource::CallerHotelProfile => "callerHotelProfile",
            Resource::Rooms => "rooms",
            Resource::Bookings => "bookings",
            Resource::InviteTokens => "inviteTokens",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resource name plus the serialized filter payload, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: Resource,
    pub filter: Option<String>,
}

impl QueryKey {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            filter: None,
        }
    }

    pub fn filtered<F: Serialize>(resource: Resource, filter: &F) -> Self {
        Self {
            resource,
            filter: serde_json::to_string(filter).ok(),
        }
    }
}

/// Every backend write the portal performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    SaveProfile,
    MakeMeAdmin,
    ConsumeInviteToken,
    CreateInviteToken,
    UpdateHotelProfile,
    SetHotelActiveStatus,
    SetHotelSubscriptionStatus,
    ActivateHotelOwner,
    AddPaymentMethod,
    RemovePaymentMethod,
    CreateRoom,
    UpdateRoom,
    CreateBooking,
    SetPaymentProof,
    UpdateBookingStatus,
    RecordStayCompletion,
    RemoveLegacyRoomPhotos,
    RemoveLegacyPaymentMethods,
    PurgePrincipalData,
}

impl Mutation {
    /// Buckets that are stale once this mutation succeeds.
    pub fn invalidates(&self) -> &'static [Resource] {
        use Resource::*;
        match self {
            Mutation::SaveProfile => &[CallerUserProfile],
            Mutation::MakeMeAdmin => &[CallerUserRole, IsCallerAdmin],
            Mutation::ConsumeInviteToken => &[
                CallerUserRole,
                IsCallerAdmin,
                CallerUserProfile,
                CallerHotelProfile,
                Hotels,
            ],
            Mutation::CreateInviteToken => &[InviteTokens],
            Mutation::UpdateHotelProfile
            | Mutation::SetHotelActiveStatus
            | Mutation::SetHotelSubscriptionStatus
            | Mutation::AddPaymentMethod
            | Mutation::RemovePaymentMethod
            | Mutation::RemoveLegacyPaymentMethods => &[Hotels, CallerHotelProfile],
            Mutation::ActivateHotelOwner => &[Hotels, CallerUserRole, CallerHotelProfile],
            Mutation::CreateRoom | Mutation::UpdateRoom | Mutation::RemoveLegacyRoomPhotos => {
                &[Rooms, Hotels, CallerHotelProfile]
            }
            Mutation::CreateBooking
            | Mutation::SetPaymentProof
            | Mutation::UpdateBookingStatus
            | Mutation::RecordStayCompletion => &[Bookings],
            Mutation::PurgePrincipalData => &Resource::ALL,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mutation::SaveProfile => "saveCallerUserProfile",
            Mutation::MakeMeAdmin => "makeMeAdmin",
            Mutation::ConsumeInviteToken => "consumeInviteToken",
            Mutation::CreateInviteToken => "createInviteToken",
            Mutation::UpdateHotelProfile => "updateHotelProfile",
            Mutation::SetHotelActiveStatus => "setHotelActiveStatus",
            Mutation::SetHotelSubscriptionStatus => "setHotelSubscriptionStatus",
            Mutation::ActivateHotelOwner => "activateHotelOwner",
            Mutation::AddPaymentMethod => "addPaymentMethod",
            Mutation::RemovePaymentMethod => "removePaymentMethod",
            Mutation::CreateRoom => "createRoom",
            Mutation::UpdateRoom => "updateRoom",
            Mutation::CreateBooking => "createBooking",
            Mutation::SetPaymentProof => "setPaymentProof",
            Mutation::UpdateBookingStatus => "updateBookingStatus",
            Mutation::RecordStayCompletion => "recordStayCompletion",
            Mutation::RemoveLegacyRoomPhotos => "adminRemoveLegacyRoomPhotos",
            Mutation::RemoveLegacyPaymentMethods => "adminRemoveLegacyPaymentMethods",
            Mutation::PurgePrincipalData => "adminPurgePrincipalData",
        }
    }
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
}

pub struct QueryCache {
    entries: DashMap<QueryKey, CacheEntry>,
    inflight: DashMap<QueryKey, Arc<tokio::sync::Mutex<()>>>,
    /// Bumped on every invalidation so fetches that raced one are not stored
    generation: AtomicU64,
    stale_after: Duration,
}

impl QueryCache {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            generation: AtomicU64::new(0),
            stale_after,
        }
    }

    fn fresh<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        let entry = self.entries.get(key)?;
        if entry.fetched_at.elapsed() >= self.stale_after {
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Serve `key` from cache or run `fetch` once for all concurrent callers.
    /// Failed fetches leave the previous entry in place.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.fresh::<T>(&key) {
            return Ok(value);
        }

        let result = {
            let lock = self.inflight.entry(key.clone()).or_default().clone();
            let _guard = lock.lock().await;
            match self.fresh::<T>(&key) {
                Some(value) => Ok(value),
                None => self.fetch_and_store(key.clone(), fetch).await,
            }
        };

        // Only the map still holds the lock once nobody waits on it.
        self.inflight.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn fetch_and_store<T, E, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let generation = self.generation.load(Ordering::Acquire);
        let value = fetch().await?;
        if self.generation.load(Ordering::Acquire) == generation {
            self.entries.insert(
                key,
                CacheEntry {
                    value: Arc::new(value.clone()),
                    fetched_at: Instant::now(),
                },
            );
        }
        Ok(value)
    }

    /// Drop every entry of the given resources, whatever their filter.
    pub fn invalidate(&self, resources: &[Resource]) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.retain(|key, _| !resources.contains(&key.resource));
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
