use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use std::time::Duration;

// Env values used in tencent cos.
pub const TENCENTCLOUD_REGION: &str = "TENCENTCLOUD_REGION";
pub const TENCENTCLOUD_APPID: &str = "TENCENTCLOUD_APPID";
pub const TENCENTCLOUD_SECRET_ID: &str = "TENCENTCLOUD_SECRET_ID";
pub const TENCENTCLOUD_SECRET_KEY: &str = "TENCENTCLOUD_SECRET_KEY";
pub const TENCENTCLOUD_SECURITY_TOKEN: &str = "TENCENTCLOUD_SECURITY_TOKEN";
pub const QCLOUD_REGION: &str = "QCLOUD_REGION";
pub const QCLOUD_APPID: &str = "QCLOUD_APPID";
pub const QCLOUD_SECRET_ID: &str = "QCLOUD_SECRET_ID";
pub const QCLOUD_SECRET_KEY: &str = "QCLOUD_SECRET_KEY";
pub const QCLOUD_SECURITY_TOKEN: &str = "QCLOUD_SECURITY_TOKEN";

// Headers used in tencent cos.
pub const X_COS_SECURITY_TOKEN: &str = "x-cos-security-token";
pub const X_COS_ACL: &str = "x-cos-acl";

/// Domain every COS endpoint lives under.
pub const ENDPOINT_SUFFIX: &str = "myqcloud.com";

/// Validity window of a header signature, counted from send time.
pub const DEFAULT_SIGN_WINDOW: Duration = Duration::from_secs(900);

/// AsciiSet for [Tencent UriEncode](https://cloud.tencent.com/document/product/436/7778)
///
/// - URI encode every byte except the unreserved characters: 'A'-'Z', 'a'-'z', '0'-'9', '-', '.', '_', and '~'.
pub static COS_URI_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
