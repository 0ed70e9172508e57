use crate::constants::COS_URI_ENCODE_SET;
use crate::{Credential, SignatureScope, SignedToken};
use http::Method;
use log::debug;
use percent_encoding::{percent_decode_str, utf8_percent_encode};
use qcos_core::hash::{hex_hmac_sha1, hex_sha1};
use qcos_core::{Error, Result, SigningCredential, SigningRequest};

/// Compute the COS signature token of one request.
///
/// `path` is the request path as sent on the wire, still percent encoded.
/// Only the query parameters and headers whose names are signed by `scope`
/// take part in the signature. The function is pure: the same inputs always
/// give the same token.
pub fn sign(
    cred: &Credential,
    method: &Method,
    path: &str,
    query: &[(String, String)],
    headers: &[(String, String)],
    scope: &SignatureScope,
) -> Result<SignedToken> {
    if !cred.is_valid() {
        return Err(Error::invalid_credentials(
            "secret id and secret key must not be empty",
        ));
    }
    scope.validate()?;

    let key_time = scope.key_time();
    let sign_key = hex_hmac_sha1(cred.secret_key.as_bytes(), key_time.as_bytes());

    let (param_list, param_string) = canonicalize(query, |k| scope.is_signed_param(k));
    debug!("param list: {param_list}");
    debug!("param string: {param_string}");

    let (header_list, header_string) = canonicalize(headers, |k| scope.is_signed_header(k));
    debug!("header list: {header_list}");
    debug!("header string: {header_string}");

    let mut http_string = String::new();

    http_string.push_str(&method.as_str().to_ascii_lowercase());
    http_string.push('\n');
    http_string.push_str(&percent_decode_str(path).decode_utf8_lossy());
    http_string.push('\n');
    http_string.push_str(&param_string);
    http_string.push('\n');
    http_string.push_str(&header_string);
    http_string.push('\n');
    debug!("http string: {http_string}");

    let mut string_to_sign = String::new();
    string_to_sign.push_str("sha1");
    string_to_sign.push('\n');
    string_to_sign.push_str(&key_time);
    string_to_sign.push('\n');
    string_to_sign.push_str(&hex_sha1(http_string.as_bytes()));
    string_to_sign.push('\n');
    debug!("string_to_sign: {string_to_sign}");

    let signature = hex_hmac_sha1(sign_key.as_bytes(), string_to_sign.as_bytes());

    Ok(SignedToken::new(format!(
        "q-sign-algorithm=sha1&q-ak={}&q-sign-time={}&q-key-time={}&q-header-list={}&q-url-param-list={}&q-signature={}",
        cred.secret_id, key_time, key_time, header_list, param_list, signature
    )))
}

/// Sign the method, path, query and headers held by a [`SigningRequest`].
pub fn sign_request(
    cred: &Credential,
    req: &SigningRequest,
    scope: &SignatureScope,
) -> Result<SignedToken> {
    let headers = req.header_to_vec()?;
    sign(cred, &req.method, &req.path, &req.query, &headers, scope)
}

/// Returns `(name_list, pair_string)` for the signed subset of `pairs`.
///
/// Keys are lower cased then encoded, values are encoded. Pairs are sorted by
/// key; duplicate keys keep their original relative order.
fn canonicalize(pairs: &[(String, String)], signed: impl Fn(&str) -> bool) -> (String, String) {
    let mut pairs = pairs
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .filter(|(k, _)| signed(k))
        .map(|(k, v)| {
            (
                utf8_percent_encode(&k, &COS_URI_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &COS_URI_ENCODE_SET).to_string(),
            )
        })
        .collect::<Vec<_>>();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut names = pairs.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>();
    names.dedup();

    let pair_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    (names.join(";"), pair_string)
}
