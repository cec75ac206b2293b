//! Developer identities are derived, not fetched directly: every commit's
//! author/committer identity widens the `[first_active, last_active]`
//! window for that normalised email.

use coderisk_types::{normalize_email, Developer, Identity};
use relational_store::{developers, Pool};
use uuid::Uuid;

use crate::errors::Result;

pub async fn upsert_from_identity(pool: &Pool, repo_id: Uuid, identity: &Identity) -> Result<()> {
    if identity.email.is_empty() {
        return Ok(());
    }

    let dev = Developer {
        repo_id,
        normalized_email: normalize_email(&identity.email),
        name: identity.name.clone(),
        first_active: identity.when,
        last_active: identity.when,
    };
    developers::upsert_developer(pool, &dev).await?;
    Ok(())
}
