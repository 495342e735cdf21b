//! World context and the isolation predicate
//!
//! A [`WorldContext`] is derived once per request. Every world-scoped read
//! filters with [`filter_for`], every write tags with [`tag`], and
//! [`can_access`] is the single isolation invariant: a row is visible only
//! when its world tag equals the context's world id (`None == None` for
//! production).
//!
//! Derivation is fail-closed. A missing, malformed or badly signed token
//! yields the production context, never an arbitrary test world.

use crate::rows::WorldScoped;
use testworld_core::WorldId;

/// Request header carrying the world token
pub const WORLD_HEADER: &str = "x-test-world";
/// Cookie carrying the world token
pub const WORLD_COOKIE: &str = "test-world";

const TOKEN_VERSION: &str = "tw1";
const KEY_CONTEXT: &str = "testworld world context token v1";
const MAX_WORLD_ID_LEN: usize = 128;

/// Request-scoped world context
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct WorldContext {
    world_id: Option<WorldId>,
    is_test_mode: bool,
    isolation_prefix: String,
}

impl WorldContext {
    /// Production context (no world)
    #[inline]
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Context scoped to a test world
    #[must_use]
    pub fn for_world(world: impl Into<WorldId>) -> Self {
        let world = world.into();
        let isolation_prefix = format!("tw_{world}_");
        Self {
            world_id: Some(world),
            is_test_mode: true,
            isolation_prefix,
        }
    }

    /// World id, `None` for production
    #[inline]
    #[must_use]
    pub fn world_id(&self) -> Option<&WorldId> {
        self.world_id.as_ref()
    }

    /// Whether this is a test-world context
    #[inline]
    #[must_use]
    pub fn is_test_mode(&self) -> bool {
        self.is_test_mode
    }

    /// Prefix for names that must not collide across worlds (empty in production)
    #[inline]
    #[must_use]
    pub fn isolation_prefix(&self) -> &str {
        &self.isolation_prefix
    }

    /// Apply the isolation prefix to a name
    #[must_use]
    pub fn isolate(&self, name: &str) -> String {
        format!("{}{name}", self.isolation_prefix)
    }
}

/// Equality predicate on the world-tag column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorldFilter {
    world_id: Option<WorldId>,
}

impl WorldFilter {
    /// Filter matching production rows (null tag)
    #[inline]
    #[must_use]
    pub fn production() -> Self {
        Self { world_id: None }
    }

    /// Filter matching rows tagged with `world`
    #[inline]
    #[must_use]
    pub fn world(world: impl Into<WorldId>) -> Self {
        Self {
            world_id: Some(world.into()),
        }
    }

    /// Tag value this filter requires
    #[inline]
    #[must_use]
    pub fn world_id(&self) -> Option<&WorldId> {
        self.world_id.as_ref()
    }

    /// Whether a row tag satisfies the predicate
    #[inline]
    #[must_use]
    pub fn matches(&self, row_world: Option<&WorldId>) -> bool {
        self.world_id.as_ref() == row_world
    }
}

/// Filter for every query issued under `context`
#[inline]
#[must_use]
pub fn filter_for(context: &WorldContext) -> WorldFilter {
    WorldFilter {
        world_id: context.world_id.clone(),
    }
}

/// Attach the context's world tag to a row before insert
#[inline]
#[must_use]
pub fn tag<R: WorldScoped>(mut row: R, context: &WorldContext) -> R {
    row.set_world_id(context.world_id.clone());
    row
}

/// Whether a row tagged `row_world` is visible under `context`
#[inline]
#[must_use]
pub fn can_access(row_world: Option<&WorldId>, context: &WorldContext) -> bool {
    context.world_id.as_ref() == row_world
}

/// Issues and verifies signed world tokens
///
/// Token format: `tw1.<world_id>.<hex blake3 keyed MAC of world_id>`.
#[derive(Clone)]
pub struct ContextSigner {
    key: [u8; 32],
}

impl std::fmt::Debug for ContextSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextSigner").finish_non_exhaustive()
    }
}

impl ContextSigner {
    /// Derive a signing key from a shared secret
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret),
        }
    }

    /// Issue a token for `world`
    #[must_use]
    pub fn issue(&self, world: &WorldId) -> String {
        format!("{TOKEN_VERSION}.{world}.{}", self.mac(world.as_str()).to_hex())
    }

    /// Verify a token, returning its world id
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<WorldId> {
        let rest = token.trim().strip_prefix(TOKEN_VERSION)?.strip_prefix('.')?;
        let (world, mac) = rest.rsplit_once('.')?;
        if !valid_world_id(world) {
            return None;
        }
        let presented = blake3::Hash::from_hex(mac).ok()?;
        // blake3::Hash equality is constant-time
        (presented == self.mac(world)).then(|| WorldId::new(world))
    }

    /// Context from a raw token; anything unverifiable is production
    #[must_use]
    pub fn context_from_token(&self, token: Option<&str>) -> WorldContext {
        match token.and_then(|t| self.verify(t)) {
            Some(world) => WorldContext::for_world(world),
            None => {
                if token.is_some() {
                    tracing::debug!("rejected world token, falling back to production");
                }
                WorldContext::production()
            }
        }
    }

    /// Context from request headers
    ///
    /// The `x-test-world` header takes precedence over the `test-world`
    /// cookie. Header names are matched case-insensitively.
    #[must_use]
    pub fn context_from_headers<'a, I>(&self, headers: I) -> WorldContext
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut header_token = None;
        let mut cookie_token = None;
        for (name, value) in headers {
            if name.eq_ignore_ascii_case(WORLD_HEADER) {
                header_token.get_or_insert(value);
            } else if name.eq_ignore_ascii_case("cookie") && cookie_token.is_none() {
                cookie_token = cookie_value(value, WORLD_COOKIE);
            }
        }
        self.context_from_token(header_token.or(cookie_token))
    }

    fn mac(&self, world: &str) -> blake3::Hash {
        blake3::keyed_hash(&self.key, world.as_bytes())
    }
}

fn valid_world_id(world: &str) -> bool {
    !world.is_empty()
        && world.len() <= MAX_WORLD_ID_LEN
        && world
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::ChatRow;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn signer() -> ContextSigner {
        ContextSigner::new(b"test secret")
    }

    #[test]
    fn production_context_has_no_world() {
        let ctx = WorldContext::production();
        assert_eq!(ctx.world_id(), None);
        assert!(!ctx.is_test_mode());
        assert_eq!(ctx.isolation_prefix(), "");
    }

    #[test]
    fn world_context_prefixes_names() {
        let ctx = WorldContext::for_world("w-1");
        assert!(ctx.is_test_mode());
        assert_eq!(ctx.isolate("bucket"), "tw_w-1_bucket");
    }

    #[test]
    fn can_access_is_exact_equality() {
        let a = WorldId::new("a");
        let b = WorldId::new("b");
        let ctx_a = WorldContext::for_world(a.clone());
        let prod = WorldContext::production();

        assert!(can_access(Some(&a), &ctx_a));
        assert!(!can_access(Some(&b), &ctx_a));
        assert!(!can_access(None, &ctx_a));
        assert!(can_access(None, &prod));
        assert!(!can_access(Some(&a), &prod));
    }

    #[test]
    fn filter_matches_like_can_access() {
        let ctx = WorldContext::for_world("a");
        let filter = filter_for(&ctx);
        assert!(filter.matches(Some(&WorldId::new("a"))));
        assert!(!filter.matches(None));
        assert!(filter_for(&WorldContext::production()).matches(None));
    }

    #[test]
    fn tag_overwrites_row_world() {
        let row = ChatRow::new("c1", "u1", "Chat");
        let row = tag(row, &WorldContext::for_world("a"));
        assert_eq!(row.world_id(), Some(&WorldId::new("a")));
        let row = tag(row, &WorldContext::production());
        assert_eq!(row.world_id(), None);
    }

    #[test]
    fn issued_token_verifies() {
        let s = signer();
        let token = s.issue(&WorldId::new("w-123-worker_1"));
        assert_eq!(s.verify(&token), Some(WorldId::new("w-123-worker_1")));
    }

    #[test]
    fn tampered_token_falls_back_to_production() {
        let s = signer();
        let token = s.issue(&WorldId::new("alpha"));
        let forged = token.replace("alpha", "bravo");
        assert_eq!(s.context_from_token(Some(&forged)), WorldContext::production());
        assert_eq!(s.context_from_token(Some("garbage")), WorldContext::production());
        assert_eq!(s.context_from_token(Some("tw1..")), WorldContext::production());
        assert_eq!(s.context_from_token(None), WorldContext::production());
    }

    #[test]
    fn token_from_other_secret_rejected() {
        let token = ContextSigner::new(b"other").issue(&WorldId::new("alpha"));
        assert_eq!(signer().verify(&token), None);
    }

    #[test]
    fn header_beats_cookie() {
        let s = signer();
        let header = s.issue(&WorldId::new("from-header"));
        let cookie = format!("session=x; {WORLD_COOKIE}={}", s.issue(&WorldId::new("from-cookie")));
        let ctx = s.context_from_headers([("Cookie", cookie.as_str()), ("X-Test-World", header.as_str())]);
        assert_eq!(ctx.world_id(), Some(&WorldId::new("from-header")));

        let ctx = s.context_from_headers([("cookie", cookie.as_str())]);
        assert_eq!(ctx.world_id(), Some(&WorldId::new("from-cookie")));
    }

    #[test]
    fn no_headers_is_production() {
        let ctx = signer().context_from_headers(std::iter::empty());
        assert_eq!(ctx, WorldContext::production());
    }

    proptest! {
        #[test]
        fn issued_tokens_round_trip(world in "[A-Za-z0-9_-]{1,64}") {
            let s = signer();
            let world = WorldId::new(world);
            prop_assert_eq!(s.verify(&s.issue(&world)), Some(world.clone()));
            let ctx = s.context_from_token(Some(&s.issue(&world)));
            prop_assert_eq!(ctx.world_id(), Some(&world));
        }

        #[test]
        fn arbitrary_tokens_never_name_a_world(token in ".{0,96}") {
            prop_assume!(!token.starts_with("tw1."));
            prop_assert_eq!(signer().context_from_token(Some(&token)), WorldContext::production());
        }
    }
}
