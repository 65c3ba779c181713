//! 服务端会话（cookie 里只放会话 id）和登录提取器。

use std::collections::HashMap;
use std::future::{ready, Ready};
use std::time::{Duration, Instant};

use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "quiz_session";

/// 会话闲置超过一周即失效
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Session {
    pub token: Option<String>,
    pub is_admin: bool,
    last_seen: Instant,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            token: None,
            is_admin: false,
            last_seen: Instant::now(),
        }
    }
}

impl Session {
    fn is_anonymous(&self) -> bool {
        self.token.is_none() && !self.is_admin
    }
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_ttl(SESSION_IDLE_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// 读取会话并刷新活跃时间，过期的会话顺便删掉
    pub fn get(&self, id: Uuid) -> Option<Session> {
        let mut sessions = self.sessions.write();
        let expired = sessions.get(&id)?.last_seen.elapsed() >= self.idle_ttl;
        if expired {
            sessions.remove(&id);
            return None;
        }
        let session = sessions.get_mut(&id)?;
        session.last_seen = Instant::now();
        Some(session.clone())
    }

    /// 登录成功时换发新的会话 id：旧会话的内容搬到新 id 下，旧 id 作废
    pub fn rotate(&self, old: Option<Uuid>, f: impl FnOnce(&mut Session)) -> Uuid {
        let mut sessions = self.sessions.write();
        let ttl = self.idle_ttl;
        sessions.retain(|_, s| s.last_seen.elapsed() < ttl);

        let mut session = old.and_then(|id| sessions.remove(&id)).unwrap_or_default();
        session.last_seen = Instant::now();
        f(&mut session);
        let id = Uuid::new_v4();
        sessions.insert(id, session);
        id
    }

    // 退出登录：修改后既无口令也非管理员的会话直接删除
    pub fn release(&self, id: Uuid, f: impl FnOnce(&mut Session)) {
        let mut sessions = self.sessions.write();
        let Some(session) = sessions.get_mut(&id) else {
            return;
        };
        f(session);
        let anonymous = session.is_anonymous();
        if anonymous {
            sessions.remove(&id);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.sessions.read().len()
    }
}

pub fn session_id(req: &HttpRequest) -> Option<Uuid> {
    req.cookie(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
}

pub fn current_session(req: &HttpRequest) -> Option<Session> {
    let state = req.app_data::<web::Data<AppState>>()?;
    state.sessions.get(session_id(req)?)
}

pub fn session_cookie(id: Uuid) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, id.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

/// 已登录用户。未登录时页面跳转 `/login`，`/api/*` 返回 401
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub token: String,
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = current_session(req)
            .and_then(|s| s.token)
            .map(|token| CurrentUser { token });
        ready(user.ok_or_else(|| {
            if req.path().starts_with("/api/") {
                AppError::LoginRequired
            } else {
                AppError::Redirect("/login")
            }
        }))
    }
}

/// 通过管理员密码校验的会话
#[derive(Debug, Clone, Copy)]
pub struct AdminUser;

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let is_admin = current_session(req).is_some_and(|s| s.is_admin);
        ready(if is_admin {
            Ok(AdminUser)
        } else {
            Err(AppError::Redirect("/admin/login"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_moves_the_session_to_a_fresh_id() {
        let store = SessionStore::new();
        let first = store.rotate(None, |s| s.token = Some("student".into()));
        assert_eq!(store.get(first).unwrap().token.as_deref(), Some("student"));

        let second = store.rotate(Some(first), |s| s.is_admin = true);
        assert_ne!(second, first);
        assert!(store.get(first).is_none());
        let session = store.get(second).unwrap();
        assert_eq!(session.token.as_deref(), Some("student"));
        assert!(session.is_admin);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_ids_get_a_fresh_session() {
        let store = SessionStore::new();
        let forged = Uuid::new_v4();
        let id = store.rotate(Some(forged), |_| {});
        assert_ne!(id, forged);
        assert!(store.get(forged).is_none());
    }

    #[test]
    fn release_drops_sessions_left_without_credentials() {
        let store = SessionStore::new();
        let id = store.rotate(None, |s| {
            s.token = Some("student".into());
            s.is_admin = true;
        });

        store.release(id, |s| s.is_admin = false);
        assert_eq!(store.get(id).unwrap().token.as_deref(), Some("student"));
        store.release(id, |s| s.token = None);
        assert!(store.get(id).is_none());
        assert_eq!(store.len(), 0);

        store.release(Uuid::new_v4(), |s| s.is_admin = true);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn idle_sessions_expire() {
        let store = SessionStore::with_idle_ttl(Duration::ZERO);
        let id = store.rotate(None, |s| s.token = Some("student".into()));
        assert!(store.get(id).is_none());

        store.rotate(None, |s| s.token = Some("a".into()));
        store.rotate(None, |s| s.token = Some("b".into()));
        assert_eq!(store.len(), 1, "expired sessions are pruned on login");
    }

    #[test]
    fn cookie_is_http_only() {
        let id = Uuid::new_v4();
        let cookie = session_cookie(id);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), id.to_string());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
