use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

/// Generate an Ed25519 token-signing keypair and write it to files.
///
/// Writes `<prefix>.secret` (base64 32-byte seed, mode 0600 on Unix) and
/// `<prefix>.pub` (base64 32-byte verifying key). The `.pub` contents are
/// what `[auth] public_key` expects.
pub fn cmd_keygen(output_prefix: &str) {
    let mut rng = rand::rngs::OsRng;
    let signing_key = SigningKey::generate(&mut rng);
    let verifying_key = signing_key.verifying_key();

    let secret_path = format!("{}.secret", output_prefix);
    if let Err(e) = std::fs::write(&secret_path, BASE64.encode(signing_key.to_bytes())) {
        eprintln!("error writing secret key to '{}': {}", secret_path, e);
        std::process::exit(1);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        if let Err(e) = std::fs::set_permissions(&secret_path, perms) {
            eprintln!(
                "warning: failed to set permissions on '{}': {}",
                secret_path, e
            );
        }
    }

    let pub_path = format!("{}.pub", output_prefix);
    if let Err(e) = std::fs::write(&pub_path, BASE64.encode(verifying_key.to_bytes())) {
        eprintln!("error writing public key to '{}': {}", pub_path, e);
        std::process::exit(1);
    }

    println!(
        "Generated Ed25519 keypair: {}.secret, {}.pub (fingerprint {})",
        output_prefix,
        output_prefix,
        key_fingerprint(&verifying_key)
    );
}

/// Read a `.secret` file: a base64-encoded 32-byte Ed25519 seed.
pub fn read_secret_key(path: &Path) -> Result<SigningKey, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading secret key '{}': {}", path.display(), e))?;
    let bytes = BASE64
        .decode(contents.trim())
        .map_err(|e| format!("error decoding secret key '{}': {}", path.display(), e))?;
    let key_bytes: [u8; 32] = bytes.try_into().map_err(|_| {
        format!(
            "invalid secret key length in '{}': expected 32 bytes",
            path.display()
        )
    })?;
    Ok(SigningKey::from_bytes(&key_bytes))
}

/// Decode a base64 verifying key as found in config or a `.pub` file.
pub fn decode_public_key(encoded: &str) -> Result<VerifyingKey, String> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| format!("error decoding public key: {}", e))?;
    let key_bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| "invalid public key length: expected 32 bytes".to_string())?;
    VerifyingKey::from_bytes(&key_bytes).map_err(|e| format!("invalid public key material: {}", e))
}

/// First 16 hex characters of SHA-256 over the key bytes.
pub fn key_fingerprint(key: &VerifyingKey) -> String {
    let digest = Sha256::digest(key.to_bytes());
    format!("{:x}", digest)[..16].to_string()
}
