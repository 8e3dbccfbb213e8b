/// An authenticated legacy-client session.
///
/// The JWT columns hold AES-GCM sealed blobs; the key is derived per request
/// from the secret half of the client's token and is never stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: String,
    pub user_did: String,
    pub handle: String,
    pub access_jwt: Vec<u8>,
    pub refresh_jwt: Vec<u8>,
    pub created_at: String,
    pub expires_at: i64,
}

/// A new session row, before insertion.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: String,
    pub user_did: String,
    pub handle: String,
    pub access_jwt: Vec<u8>,
    pub refresh_jwt: Vec<u8>,
    pub expires_at: i64,
}
