/*!
 PBKDF2 key derivation compatible with `ActiveSupport::KeyGenerator` and `ActiveSupport::CachingKeyGenerator`.
*/

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;

use crate::error::key_generator::KeyGeneratorError;

/// Derived keys, keyed by salt and key size in bits
type KeyCache = HashMap<(String, usize), Arc<[u8]>>;

/// Derives keys from a secret with PBKDF2-HMAC-SHA1, as Rails does for cookies
pub struct KeyGenerator {
    secret: String,
    iterations: u32,
    /// Present when keys should be memoized, like `ActiveSupport::CachingKeyGenerator`
    cache: Option<Mutex<KeyCache>>,
}

impl KeyGenerator {
    /// Create a generator that derives a fresh key on every call
    pub fn new(secret: impl Into<String>, iterations: u32) -> Self {
        Self {
            secret: secret.into(),
            iterations,
            cache: None,
        }
    }

    /// Create a generator that remembers every key it derives
    pub fn with_cache(secret: impl Into<String>, iterations: u32) -> Self {
        Self {
            cache: Some(Mutex::new(HashMap::new())),
            ..Self::new(secret, iterations)
        }
    }

    /// Derive a key of `key_size` bits for `salt`
    ///
    /// # Example
    ///
    /// ```
    /// use rails_compat::active_support::key_generator::KeyGenerator;
    ///
    /// let generator = KeyGenerator::new("secret", 1000);
    /// let key = generator.generate_key("authenticated encrypted cookie", 256).unwrap();
    /// assert_eq!(key.len(), 32);
    /// ```
    pub fn generate_key(&self, salt: &str, key_size: usize) -> Result<Arc<[u8]>, KeyGeneratorError> {
        let Some(cache) = &self.cache else {
            return self.derive(salt, key_size);
        };

        let cache_key = (salt.to_string(), key_size);
        let cached = lock(cache).get(&cache_key).cloned();
        if let Some(key) = cached {
            return Ok(key);
        }

        // Derivation is slow, so the lock is not held while it runs
        let key = self.derive(salt, key_size)?;
        Ok(Arc::clone(lock(cache).entry(cache_key).or_insert(key)))
    }

    fn derive(&self, salt: &str, key_size: usize) -> Result<Arc<[u8]>, KeyGeneratorError> {
        if key_size == 0 || key_size % 8 != 0 {
            return Err(KeyGeneratorError::InvalidKeySize(key_size));
        }
        if self.iterations == 0 {
            return Err(KeyGeneratorError::InvalidIterations);
        }

        let mut key = vec![0; key_size / 8];
        pbkdf2_hmac::<Sha1>(
            self.secret.as_bytes(),
            salt.as_bytes(),
            self.iterations,
            &mut key,
        );
        Ok(key.into())
    }
}

/// A panic while holding the lock cannot leave a half-written key, so poisoning is ignored
fn lock(cache: &Mutex<KeyCache>) -> MutexGuard<'_, KeyCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}
