//! # Stream Encryption
//!
//! Copies bytes from an async reader to an async writer while applying the
//! XChaCha20 keystream, without buffering the whole payload.
//!
//! Layout written by [`encrypt_copy`] and expected by [`decrypt_copy`]:
//!
//! ```text
//! +--------------+-------------------------------+
//! | nonce (24 B) | plaintext XOR keystream (n B) |
//! +--------------+-------------------------------+
//! ```

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::{Key, XChaCha20, XNonce};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::symmetric::{Nonce, SecretKey, NONCE_LEN};
use crate::CryptoError;

/// Bytes an encrypted stream carries in addition to its plaintext.
pub const ENCRYPTION_OVERHEAD: u64 = NONCE_LEN as u64;

const CHUNK_SIZE: usize = 32 * 1024;

/// Copy `src` to `dst`, encrypting on the way.
///
/// Returns the number of bytes written to `dst`, nonce included, i.e. the
/// plaintext length plus [`ENCRYPTION_OVERHEAD`].
///
/// # Errors
///
/// Returns `CryptoError::Io` if reading `src` or writing `dst` fails.
pub async fn encrypt_copy<R, W>(
    key: &SecretKey,
    src: &mut R,
    dst: &mut W,
) -> Result<u64, CryptoError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let nonce = Nonce::generate();
    dst.write_all(nonce.as_bytes()).await?;

    let cipher = XChaCha20::new(
        Key::from_slice(key.as_bytes()),
        XNonce::from_slice(nonce.as_bytes()),
    );
    let written = keystream_copy(cipher, src, dst).await?;

    Ok(written + ENCRYPTION_OVERHEAD)
}

/// Copy `src` to `dst`, decrypting on the way.
///
/// Returns the number of plaintext bytes written to `dst`.
///
/// # Errors
///
/// Returns `CryptoError::TruncatedCiphertext` if `src` ends inside the nonce
/// prefix and `CryptoError::Io` for any other read or write failure.
pub async fn decrypt_copy<R, W>(
    key: &SecretKey,
    src: &mut R,
    dst: &mut W,
) -> Result<u64, CryptoError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut prefix = [0u8; NONCE_LEN];
    let mut filled = 0;
    while filled < NONCE_LEN {
        let n = src.read(&mut prefix[filled..]).await?;
        if n == 0 {
            return Err(CryptoError::TruncatedCiphertext {
                missing: NONCE_LEN - filled,
            });
        }
        filled += n;
    }

    let nonce = Nonce::from_bytes(prefix);
    let cipher = XChaCha20::new(
        Key::from_slice(key.as_bytes()),
        XNonce::from_slice(nonce.as_bytes()),
    );
    keystream_copy(cipher, src, dst).await
}

async fn keystream_copy<R, W>(
    mut cipher: XChaCha20,
    src: &mut R,
    dst: &mut W,
) -> Result<u64, CryptoError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = src.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        cipher.apply_keystream(&mut buf[..n]);
        dst.write_all(&buf[..n]).await?;
        total += n as u64;
    }
    dst.flush().await?;

    Ok(total)
}
