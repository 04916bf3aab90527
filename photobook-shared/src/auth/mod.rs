/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and password rules
/// - [`jwt`]: session token generation and validation
/// - [`account_token`]: signed activation and password reset links
/// - [`authorization`]: album and profile access policy
///
/// All signature comparisons are constant-time.

pub mod account_token;
pub mod authorization;
pub mod jwt;
pub mod password;
