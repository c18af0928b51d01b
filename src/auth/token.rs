use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use std::future::Future;

use super::error::{AuthError, StoreError};

const TOKEN_BYTES: usize = 32;
const TOKEN_ATTEMPTS: usize = 3;

/// Create a new opaque token for session cookies and reset links.
///
/// The token has no structure: 32 bytes from the OS RNG, URL-safe base64.
pub(crate) fn generate_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(AuthError::Token)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Generate a token and hand it to `write`, retrying on a unique-token
/// collision. Returns the token that was stored.
///
/// # Errors
/// Returns the first non-conflict store error, or an integrity error after
/// `TOKEN_ATTEMPTS` collisions.
pub(crate) async fn store_unique_token<F, Fut>(mut write: F) -> Result<String, AuthError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(), StoreError>>,
{
    for _ in 0..TOKEN_ATTEMPTS {
        let token = generate_token()?;
        match write(token.clone()).await {
            Ok(()) => return Ok(token),
            Err(StoreError::TokenConflict { .. }) => {}
            Err(err) => return Err(err.into()),
        }
    }
    Err(StoreError::Integrity("failed to generate a unique token".to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::HashSet,
        sync::atomic::{AtomicUsize, Ordering},
    };

    #[test]
    fn generate_token_round_trip() {
        let decoded_len = generate_token()
            .ok()
            .and_then(|token| Base64UrlUnpadded::decode_vec(&token).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded_len, Some(TOKEN_BYTES));
    }

    #[test]
    fn generate_token_is_url_safe() {
        let token = generate_token().unwrap_or_default();
        assert!(!token.is_empty());
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn generate_token_does_not_repeat() {
        let tokens: HashSet<String> = (0..64).filter_map(|_| generate_token().ok()).collect();
        assert_eq!(tokens.len(), 64);
    }

    #[tokio::test]
    async fn store_unique_token_retries_conflicts() {
        let calls = AtomicUsize::new(0);
        let stored = store_unique_token(|_| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(StoreError::TokenConflict { field: "session_id" })
                } else {
                    Ok(())
                }
            }
        })
        .await;
        assert!(stored.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn store_unique_token_gives_up() {
        let calls = AtomicUsize::new(0);
        let stored = store_unique_token(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::TokenConflict { field: "reset_token" }) }
        })
        .await;
        assert!(matches!(
            stored,
            Err(AuthError::Store(StoreError::Integrity(_)))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), TOKEN_ATTEMPTS);
    }

    #[tokio::test]
    async fn store_unique_token_passes_other_errors() {
        let stored = store_unique_token(|_| async { Err(StoreError::NotFound) }).await;
        assert!(matches!(stored, Err(AuthError::Store(StoreError::NotFound))));
    }
}
