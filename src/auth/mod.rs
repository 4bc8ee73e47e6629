mod password;
pub use password::{hash_password, verify_password};
mod jwt;
pub use jwt::{
    RefreshClaims, UserClaims, generate_refresh_token_jwt, generate_token, process_refresh_token,
    process_token,
};
mod token;
pub use token::generate_refresh_token;
mod error;
pub use error::{CryptError, CryptResult};
