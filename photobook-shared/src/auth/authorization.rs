/// Access policy for albums, images and profiles
///
/// # Rules
///
/// 1. **Public albums** can be read by anyone, including anonymous visitors
/// 2. **Private albums** can be read by their author only; to everyone else
///    they do not exist
/// 3. **Writes** (edit, delete, adding or removing images) need the author
/// 4. **Profiles** can be changed by their owner only
///
/// The checks are pure functions over the loaded records so handlers call
/// them explicitly right after loading.
///
/// # Example
///
/// ```text
/// let album = store.find_album(id).await?.ok_or(AppError::NotFound)?;
/// authorize_album(&album, viewer, ResourcePermission::Write)?;
/// ```

use uuid::Uuid;

use crate::models::Album;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// The action needs a signed-in user
    #[error("Authentication required")]
    Unauthenticated,

    /// Signed in, but not allowed
    #[error("Not authorized to access this resource")]
    NotAuthorized,

    /// The resource is hidden from this viewer
    #[error("Resource not found")]
    Hidden,
}

/// Permission types for authorization checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourcePermission {
    Read,
    Write,
}

/// Checks whether `viewer` may act on `album`
///
/// # Errors
///
/// - `Hidden` for a private album the viewer does not own, whatever the
///   permission, so its existence is never revealed
/// - `Unauthenticated` for an anonymous write
/// - `NotAuthorized` for a write on someone else's public album
pub fn authorize_album(
    album: &Album,
    viewer: Option<Uuid>,
    permission: ResourcePermission,
) -> Result<(), AuthzError> {
    let is_author = viewer.is_some_and(|id| album.is_owned_by(id));

    if is_author {
        return Ok(());
    }

    if !album.is_public() {
        return Err(AuthzError::Hidden);
    }

    match (permission, viewer) {
        (ResourcePermission::Read, _) => Ok(()),
        (ResourcePermission::Write, None) => Err(AuthzError::Unauthenticated),
        (ResourcePermission::Write, Some(_)) => Err(AuthzError::NotAuthorized),
    }
}

/// Checks that `viewer` is the owner of the profile `owner_id`
pub fn require_profile_owner(viewer: Uuid, owner_id: Uuid) -> Result<(), AuthzError> {
    if viewer == owner_id {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Visibility;
    use chrono::Utc;

    fn readable(album: &Album, viewer: Option<Uuid>) -> bool {
        authorize_album(album, viewer, ResourcePermission::Read).is_ok()
    }

    fn album(author: Uuid, visibility: Visibility) -> Album {
        Album {
            id: Uuid::new_v4(),
            name: "Ngorongoro".to_string(),
            age: Some("2021".to_string()),
            description: "Crater".to_string(),
            title: "Safari".to_string(),
            location: "Arusha".to_string(),
            banner_path: "album/banner/x.jpg".to_string(),
            author_id: Some(author),
            visibility,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_album_readable_by_all() {
        let author = Uuid::new_v4();
        let album = album(author, Visibility::Public);

        assert!(readable(&album, None));
        assert!(readable(&album, Some(Uuid::new_v4())));
        assert!(readable(&album, Some(author)));
    }

    #[test]
    fn test_private_album_hidden_from_others() {
        let author = Uuid::new_v4();
        let album = album(author, Visibility::Private);

        assert!(readable(&album, Some(author)));
        assert_eq!(
            authorize_album(&album, None, ResourcePermission::Read),
            Err(AuthzError::Hidden)
        );
        assert_eq!(
            authorize_album(&album, Some(Uuid::new_v4()), ResourcePermission::Write),
            Err(AuthzError::Hidden)
        );
    }

    #[test]
    fn test_writes_need_author() {
        let author = Uuid::new_v4();
        let album = album(author, Visibility::Public);

        assert_eq!(authorize_album(&album, Some(author), ResourcePermission::Write), Ok(()));
        assert_eq!(
            authorize_album(&album, None, ResourcePermission::Write),
            Err(AuthzError::Unauthenticated)
        );
        assert_eq!(
            authorize_album(&album, Some(Uuid::new_v4()), ResourcePermission::Write),
            Err(AuthzError::NotAuthorized)
        );
    }

    #[test]
    fn test_orphaned_album_is_nobodys() {
        let mut album = album(Uuid::new_v4(), Visibility::Public);
        album.author_id = None;

        assert!(readable(&album, None));
        assert_eq!(
            authorize_album(&album, Some(Uuid::new_v4()), ResourcePermission::Write),
            Err(AuthzError::NotAuthorized)
        );
    }

    #[test]
    fn test_profile_owner() {
        let id = Uuid::new_v4();
        assert!(require_profile_owner(id, id).is_ok());
        assert_eq!(
            require_profile_owner(Uuid::new_v4(), id),
            Err(AuthzError::NotAuthorized)
        );
    }
}
