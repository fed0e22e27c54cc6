//! 测试用的内存存储和内存缓存，支持故障注入和调用计数
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use http_body_util::BodyExt;
use tokio::time::Instant;
use tower::ServiceExt;
use user_service::AppState;
use user_service::cache::CacheStore;
use user_service::config::Config;
use user_service::database::UserStore;
use user_service::error::{CacheError, StoreError};
use user_service::models::{NewUser, User, UserId, UserPatch};
use user_service::router::create_router;
use user_service::service::UserService;

pub const TTL: Duration = Duration::from_secs(10 * 60);

struct Row {
    user: User,
    password: Option<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<UserId, Row>>,
    next_id: AtomicI64,
    fetches: AtomicUsize,
    inserts: AtomicUsize,
    updates: AtomicUsize,
    unavailable: AtomicBool,
    failing_ids: Mutex<HashSet<UserId>>,
    panicking_ids: Mutex<HashSet<UserId>>,
    fetch_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, name: &str, email: &str) -> User {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let user = User {
            id,
            name: name.into(),
            email: email.into(),
        };
        self.rows.lock().unwrap().insert(
            id,
            Row {
                user: user.clone(),
                password: None,
            },
        );
        user
    }

    pub fn row(&self, id: UserId) -> Option<User> {
        self.rows.lock().unwrap().get(&id).map(|r| r.user.clone())
    }

    pub fn password_of(&self, id: UserId) -> Option<String> {
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .and_then(|r| r.password.clone())
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fail_fetch_for(&self, id: UserId) {
        self.failing_ids.lock().unwrap().insert(id);
    }

    pub fn panic_fetch_for(&self, id: UserId) {
        self.panicking_ids.lock().unwrap().insert(id);
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection refused".into()));
        }
        Ok(())
    }

    fn email_taken(rows: &HashMap<UserId, Row>, email: &str, except: Option<UserId>) -> bool {
        rows.values()
            .any(|r| r.user.email == email && Some(r.user.id) != except)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn fetch_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        if self.panicking_ids.lock().unwrap().contains(&id) {
            panic!("injected panic for user {id}");
        }
        if self.failing_ids.lock().unwrap().contains(&id) {
            return Err(StoreError::Backend(format!("injected failure for user {id}")));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(self.row(id))
    }

    async fn insert(&self, user: &NewUser) -> Result<User, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut rows = self.rows.lock().unwrap();
        if Self::email_taken(&rows, &user.email, None) {
            return Err(StoreError::Backend(
                "duplicate key value violates unique constraint \"users_email_key\"".into(),
            ));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
        };
        rows.insert(
            id,
            Row {
                user: created.clone(),
                password: user.password.clone(),
            },
        );
        Ok(created)
    }

    async fn update_by_id(
        &self,
        id: UserId,
        patch: &UserPatch,
    ) -> Result<Option<User>, StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut rows = self.rows.lock().unwrap();
        if let Some(email) = &patch.email {
            if Self::email_taken(&rows, email, Some(id)) {
                return Err(StoreError::Backend("duplicate key value".into()));
            }
        }
        let Some(row) = rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            row.user.name = name.clone();
        }
        if let Some(email) = &patch.email {
            row.user.email = email.clone();
        }
        if let Some(password) = &patch.password {
            row.password = Some(password.clone());
        }
        Ok(Some(row.user.clone()))
    }

    async fn delete_by_id(&self, id: UserId) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
    sets: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(value, _)| value.clone())
    }

    pub fn put_raw(&self, key: &str, value: &str, ttl: Duration) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.into(), (value.into(), Instant::now() + ttl));
    }

    pub fn cached_user(&self, id: UserId) -> Option<User> {
        self.raw(&id.to_string())
            .map(|json| serde_json::from_str(&json).expect("cache holds a user snapshot"))
    }

    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_set(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// 模拟 Redis 整体不可用
    pub fn go_down(&self) {
        self.fail_get(true);
        self.fail_set(true);
        self.fail_delete(true);
    }
}

fn injected(op: &str) -> CacheError {
    CacheError::Backend(format!("injected {op} failure"))
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(injected("get"));
        }
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(injected("set"));
        }
        self.put_raw(key, value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(injected("delete"));
        }
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

pub fn service(store: &Arc<MemoryStore>, cache: &Arc<MemoryCache>) -> UserService {
    UserService::new(store.clone(), cache.clone(), TTL).with_hash_cost(4)
}

pub fn test_config(production: bool) -> Config {
    let app_env = if production { "production" } else { "development" };
    Config::from_lookup(|name| match name {
        "DATABASE_URL" => Some("postgres://localhost/users_test".into()),
        "REDIS_ADDR" => Some("127.0.0.1:6379".into()),
        "APP_ENV" => Some(app_env.into()),
        _ => None,
    })
    .expect("test config is valid")
}

pub fn app(users: UserService, production: bool) -> Router {
    create_router(AppState {
        users,
        config: Arc::new(test_config(production)),
        metrics: None,
    })
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
