//! [`Codec`] sealing activation [`Claims`] into [`Token`]s and back.
//!
//! A [`Token`] is a compact [JWS] signed with HMAC-SHA256. Its header names
//! the [`KeyVersion`] it was signed with in the `kid` field, so keys may be
//! rotated by adding a new version, switching [`Codec`] to it, and dropping
//! the old one once its [`Token`]s have expired.
//!
//! [JWS]: https://datatracker.ietf.org/doc/html/rfc7515

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use derive_more::{Display, Error, From};
use jsonwebtoken::{
    errors::Error as JwtError, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use secrecy::{ExposeSecret as _, SecretString};

use super::{Claims, Token};

/// Version of a signing key, carried in every [`Token`] header.
#[derive(Clone, Copy, Debug, Eq, From, Hash, Ord, PartialEq, PartialOrd)]
pub struct KeyVersion(u32);

impl fmt::Display for KeyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl FromStr for KeyVersion {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('v')
            .filter(|n| {
                !n.starts_with('+') && (n.len() == 1 || !n.starts_with('0'))
            })
            .and_then(|n| n.parse().ok())
            .map(Self)
            .ok_or("invalid `KeyVersion`")
    }
}

/// Versioned secret signing key.
#[derive(Clone)]
pub struct Key {
    /// [`KeyVersion`] of this [`Key`].
    pub version: KeyVersion,

    /// Secret of this [`Key`].
    pub secret: SecretString,
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Stateless encoder and decoder of activation [`Token`]s.
///
/// Cheap to clone and safe to share between threads.
#[derive(Clone)]
pub struct Codec {
    /// Shared state of this [`Codec`].
    inner: Arc<Inner>,
}

/// Shared state of a [`Codec`].
struct Inner {
    /// [`KeyVersion`] new [`Token`]s are signed with.
    current: KeyVersion,

    /// [`EncodingKey`] of the [`Inner::current`] version.
    encoding_key: EncodingKey,

    /// [`DecodingKey`]s of all the trusted versions.
    decoding_keys: HashMap<KeyVersion, DecodingKey>,

    /// [`Validation`] applied when decoding.
    validation: Validation,
}

impl Codec {
    /// Signing algorithm of [`Token`]s.
    const ALGORITHM: Algorithm = Algorithm::HS256;

    /// `typ` header of [`Token`]s, keeping them apart from other [JWT]s signed
    /// by the platform.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    const TYPE: &'static str = "activation+jwt";

    /// Minimal length of a [`Key`] secret, in bytes.
    pub const MIN_SECRET_LEN: usize = 32;

    /// Creates a new [`Codec`] trusting the provided [`Key`]s and signing with
    /// the `current` one.
    ///
    /// # Errors
    ///
    /// If the provided [`Key`]s don't form a usable keyring.
    pub fn new(
        current: KeyVersion,
        keys: impl IntoIterator<Item = Key>,
    ) -> Result<Self, KeyringError> {
        use KeyringError as E;

        let mut secrets = HashMap::new();
        for Key { version, secret } in keys {
            if secret.expose_secret().len() < Self::MIN_SECRET_LEN {
                return Err(E::WeakSecret(version));
            }
            if secrets.insert(version, secret).is_some() {
                return Err(E::DuplicateVersion(version));
            }
        }
        if secrets.is_empty() {
            return Err(E::Empty);
        }
        let encoding_key = secrets
            .get(&current)
            .map(|s| EncodingKey::from_secret(s.expose_secret().as_bytes()))
            .ok_or(E::UnknownCurrent(current))?;

        let decoding_keys = secrets
            .iter()
            .map(|(v, s)| {
                (*v, DecodingKey::from_secret(s.expose_secret().as_bytes()))
            })
            .collect();

        let mut validation = Validation::new(Self::ALGORITHM);
        // Expiration is checked by `Claims::validate()` against the caller's
        // clock, with a closed upper bound.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Ok(Self {
            inner: Arc::new(Inner {
                current,
                encoding_key,
                decoding_keys,
                validation,
            }),
        })
    }

    /// Returns the [`KeyVersion`] new [`Token`]s are signed with.
    #[must_use]
    pub fn current_version(&self) -> KeyVersion {
        self.inner.current
    }

    /// Encodes the provided [`Claims`] into a [`Token`].
    ///
    /// # Errors
    ///
    /// If the [`Claims`] cannot be serialized.
    pub fn encode(&self, claims: &Claims) -> Result<Token, JwtError> {
        let mut header = Header::new(Self::ALGORITHM);
        header.typ = Some(Self::TYPE.to_owned());
        header.kid = Some(self.inner.current.to_string());

        jsonwebtoken::encode(&header, claims, &self.inner.encoding_key)
            .map(Token::from)
    }

    /// Decodes [`Claims`] out of the provided [`Token`], verifying its
    /// authenticity.
    ///
    /// # Errors
    ///
    /// If the [`Token`] is malformed, tampered, signed with an untrusted
    /// [`Key`], or carries [`Claims`] expiring before being issued.
    ///
    /// The [`DecodeError`] is meant for logs only: reporting its variants to
    /// clients would make this method an oracle.
    pub fn decode(&self, token: &Token) -> Result<Claims, DecodeError> {
        use DecodeError as E;

        let token = token.as_ref();
        let header = jsonwebtoken::decode_header(token).map_err(E::Header)?;
        if header.alg != Self::ALGORITHM {
            return Err(E::UnsupportedAlgorithm(header.alg));
        }
        if header.typ.as_deref() != Some(Self::TYPE) {
            return Err(E::UnexpectedType);
        }
        let key = header
            .kid
            .as_deref()
            .and_then(|kid| kid.parse::<KeyVersion>().ok())
            .and_then(|v| self.inner.decoding_keys.get(&v))
            .ok_or(E::UntrustedKey)?;

        let claims =
            jsonwebtoken::decode::<Claims>(token, key, &self.inner.validation)
                .map_err(E::Payload)?
                .claims;
        if !claims.is_well_formed() {
            return Err(E::IllFormedClaims);
        }
        Ok(claims)
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut trusted = self.inner.decoding_keys.keys().collect::<Vec<_>>();
        trusted.sort_unstable();
        f.debug_struct("Codec")
            .field("current", &self.inner.current)
            .field("trusted", &trusted)
            .finish_non_exhaustive()
    }
}

/// Error of building a [`Codec`] keyring.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum KeyringError {
    /// No [`Key`]s provided.
    #[display("No activation keys provided")]
    Empty,

    /// Several [`Key`]s share the same [`KeyVersion`].
    #[display("Activation key `{_0}` is provided more than once")]
    DuplicateVersion(#[error(not(source))] KeyVersion),

    /// Current [`KeyVersion`] is not among the provided [`Key`]s.
    #[display("Current activation key `{_0}` is not provided")]
    UnknownCurrent(#[error(not(source))] KeyVersion),

    /// [`Key`] secret is shorter than [`Codec::MIN_SECRET_LEN`].
    #[display(
        "Activation key `{_0}` is shorter than {} bytes",
        Codec::MIN_SECRET_LEN
    )]
    WeakSecret(#[error(not(source))] KeyVersion),
}

/// Error of decoding a [`Token`].
#[derive(Debug, Display, Error)]
pub enum DecodeError {
    /// [`Token`] header cannot be parsed.
    #[display("Malformed `Token` header: {_0}")]
    Header(JwtError),

    /// [`Token`] is signed with an algorithm other than HMAC-SHA256.
    #[display("Unsupported `Token` algorithm: {_0:?}")]
    UnsupportedAlgorithm(#[error(not(source))] Algorithm),

    /// [`Token`] header declares a foreign type.
    #[display("Unexpected `Token` type")]
    UnexpectedType,

    /// [`Token`] names no trusted [`KeyVersion`].
    #[display("`Token` key is not trusted")]
    UntrustedKey,

    /// [`Token`] signature or [`Claims`] are invalid.
    #[display("Invalid `Token` payload: {_0}")]
    Payload(JwtError),

    /// [`Claims`] expire before being issued.
    #[display("`Claims` expire before being issued")]
    IllFormedClaims,
}
