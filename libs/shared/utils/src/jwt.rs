use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;
use shared_models::auth::{JwtHeader, Session, SessionClaims};

type HmacSha256 = Hmac<Sha256>;

fn sign(signing_input: &str, secret: &str) -> Result<Vec<u8>, String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(signing_input.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Produces a compact HS256 token for the given claims.
pub fn issue_token(claims: &SessionClaims, secret: &str) -> Result<String, String> {
    if secret.is_empty() {
        return Err("Session secret is not set".to_string());
    }

    let header = JwtHeader {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };
    let header_json = serde_json::to_string(&header).map_err(|e| e.to_string())?;
    let claims_json = serde_json::to_string(claims).map_err(|e| e.to_string())?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );
    let signature = sign(&signing_input, secret)?;

    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
}

/// Token for a freshly opened session; expires together with the session.
pub fn issue_session_token(session: &Session, secret: &str) -> Result<String, String> {
    let claims = SessionClaims {
        sub: session.user.username.clone(),
        sid: session.id,
        role: session.user.role,
        iat: session.created_at.timestamp(),
        exp: session.expires_at.timestamp(),
    };
    issue_token(&claims, secret)
}

/// Checks signature and expiry. Whether the session behind the token is still
/// alive is the session store's call, not this function's.
pub fn validate_token(token: &str, secret: &str) -> Result<SessionClaims, String> {
    if secret.is_empty() {
        return Err("Session secret is not set".to_string());
    }

    // Split token into parts
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let signature_string = format!("{}.{}", header_b64, claims_b64);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(signature_string.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_json = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| "Invalid claims encoding".to_string())?;

    let claims: SessionClaims = match serde_json::from_str(&claims_json) {
        Ok(c) => c,
        Err(e) => {
            debug!("Failed to parse claims: {}", e);
            return Err("Invalid claims format".to_string());
        }
    };

    let now = chrono::Utc::now().timestamp();
    if claims.exp < now {
        debug!("Token expired at {} (now: {})", claims.exp, now);
        return Err("Token expired".to_string());
    }

    debug!("Token validated successfully for user: {}", claims.sub);
    Ok(claims)
}
