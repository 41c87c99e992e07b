use crate::error::DraftError;
use crate::model::ResourceDraft;

/// Reject drafts that cannot be synced, before any remote call
///
/// `None` stands for a null entry in the caller's input.
pub fn validate(draft: Option<&ResourceDraft>) -> Result<&ResourceDraft, DraftError> {
    let draft = draft.ok_or(DraftError::NullDraft)?;
    if draft.effective_key().is_none() {
        return Err(DraftError::MissingKey {
            name: draft.display_name().to_string(),
        });
    }
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceType;

    #[test]
    fn test_null_draft() {
        assert_eq!(validate(None), Err(DraftError::NullDraft));
        assert_eq!(DraftError::NullDraft.to_string(), "Draft is null.");
    }

    #[test]
    fn test_missing_and_blank_keys() {
        let unnamed = ResourceDraft::without_key(ResourceType::Products);
        assert_eq!(
            validate(Some(&unnamed)),
            Err(DraftError::MissingKey {
                name: "null".to_string()
            })
        );

        let blank = ResourceDraft::new(ResourceType::Products, "   ").with_name("Hat");
        let err = validate(Some(&blank)).unwrap_err();
        assert_eq!(err.to_string(), "Draft with name: Hat doesn't have a key.");
    }

    #[test]
    fn test_valid_draft_passes_through() {
        let draft = ResourceDraft::new(ResourceType::Categories, "shoes");
        assert_eq!(validate(Some(&draft)), Ok(&draft));
    }
}
