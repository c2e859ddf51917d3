use std::time::Duration;

/// Storage key of the bearer credential sent with every request.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key of the credential exchanged for a new access token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Storage key of the cached user snapshot.
pub const USER_PROFILE_KEY: &str = "userProfile";

/// Every key owned by a session, cleared together on logout.
pub const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_PROFILE_KEY];

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

pub mod paths {
    pub const REFRESH_TOKEN: &str = "/auth/refresh-token";
    pub const SEND_OTP: &str = "/auth/send-otp";
    pub const VERIFY_OTP: &str = "/auth/verify-otp";
    pub const CURRENT_USER: &str = "/auth/me";
    pub const LOGOUT: &str = "/auth/logout";
}
