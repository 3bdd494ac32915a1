//! WS-Security UsernameToken headers for authenticating ONVIF requests.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use color_eyre::eyre::{Result, WrapErr};
use sha1::{Digest, Sha1};
use time::{macros::format_description, OffsetDateTime};

const PASSWORD_DIGEST: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest";
const BASE64_BINARY: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";
const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
const WSU_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";

/// Build a `<s:Header>` element carrying a fresh UsernameToken.
pub fn security_header(username: &str, password: &str) -> Result<String> {
    let nonce: [u8; 16] = rand::random();
    let created = OffsetDateTime::now_utc()
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
        ))
        .wrap_err("failed to format timestamp")?;

    Ok(format!(
        r#"<s:Header>
    <Security xmlns="{WSSE_NS}" s:mustUnderstand="1">
      <UsernameToken>
        <Username>{username}</Username>
        <Password Type="{PASSWORD_DIGEST}">{digest}</Password>
        <Nonce EncodingType="{BASE64_BINARY}">{nonce}</Nonce>
        <Created xmlns="{WSU_NS}">{created}</Created>
      </UsernameToken>
    </Security>
  </s:Header>"#,
        username = escape(username),
        digest = password_digest(&nonce, &created, password),
        nonce = STANDARD.encode(nonce),
    ))
}

/// `Base64(SHA1(nonce + created + password))`
fn password_digest(nonce: &[u8], created: &str, password: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(created.as_bytes());
    hasher.update(password.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Escape text for use inside an XML element or attribute.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }

    escaped
}
