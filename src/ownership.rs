//! Ownership checks on mutable resources.

use std::future::Future;

use uuid::Uuid;

use crate::error::{Result, ServerError};

/// A resource owned by exactly one user.
pub trait Owned {
    /// Name used in error messages, e.g. `Journal`.
    const KIND: &'static str;

    fn owner_id(&self) -> Uuid;
}

/// Mutation attempted on an [`Owned`] resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// Load a resource and make sure `actor` owns it.
///
/// Returns [`ServerError::NotFound`] when `load` yields nothing and
/// [`ServerError::Forbidden`] when the owner differs.
pub async fn authorize_owner<R, F, Fut>(
    actor: Uuid,
    action: Action,
    load: F,
) -> Result<R>
where
    R: Owned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<R>>>,
{
    let resource = load().await?.ok_or(ServerError::NotFound(R::KIND))?;

    if resource.owner_id() != actor {
        return Err(ServerError::Forbidden {
            action: action.as_str(),
            kind: R::KIND.to_lowercase(),
        });
    }

    Ok(resource)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Note {
        owner: Uuid,
    }

    impl Owned for Note {
        const KIND: &'static str = "Note";

        fn owner_id(&self) -> Uuid {
            self.owner
        }
    }

    #[tokio::test]
    async fn test_owner_proceeds() {
        let owner = Uuid::new_v4();
        let note = authorize_owner(owner, Action::Update, || async {
            Ok(Some(Note { owner }))
        })
        .await
        .unwrap();

        assert_eq!(note.owner, owner);
    }

    #[tokio::test]
    async fn test_other_user_is_forbidden() {
        let owner = Uuid::new_v4();
        let err = authorize_owner(Uuid::new_v4(), Action::Delete, || async {
            Ok(Some(Note { owner }))
        })
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ServerError::Forbidden { action: "delete", ref kind } if kind == "note"
        ));
        assert_eq!(err.to_string(), "You are not allowed to delete this note.");
    }

    #[tokio::test]
    async fn test_missing_resource() {
        let err = authorize_owner::<Note, _, _>(
            Uuid::new_v4(),
            Action::Update,
            || async { Ok(None) },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServerError::NotFound("Note")));
        assert_eq!(err.to_string(), "Note not found.");
    }

    #[tokio::test]
    async fn test_load_error_propagates() {
        let err = authorize_owner::<Note, _, _>(
            Uuid::new_v4(),
            Action::Update,
            || async { Err(ServerError::internal("store down")) },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServerError::Internal { .. }));
    }
}
