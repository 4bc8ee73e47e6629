use crate::{
    model::{
        ModelManager,
        error::{DatabaseError, DatabaseResult},
    },
    web::AuthenticatedUser,
};

/// Resources that belong to one user (accounts, portfolios, quiz attempts).
#[async_trait::async_trait]
pub trait HasOwner {
    type OwnerId: PartialEq + Send + Sync;
    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        ctx: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId>;
}

/// `Ok` when `ctx` owns `resource` or is an admin, [`DatabaseError::Forbidden`] otherwise.
pub async fn check_access<T, O>(
    mm: &ModelManager,
    ctx: &AuthenticatedUser,
    resource: &T,
    expected: O,
) -> DatabaseResult<()>
where
    T: HasOwner<OwnerId = O> + Sync,
    O: PartialEq + Send + Sync,
{
    if ctx.is_admin() {
        return Ok(());
    }

    if resource.get_owner_id(mm, ctx).await? == expected {
        Ok(())
    } else {
        Err(DatabaseError::Forbidden)
    }
}
