use crate::interfaces::api::{ApiError, Comment, PersistedRace, RaceApi, Vote, VoteTally};
use crate::interfaces::race_state::Notice;
use flume::Sender;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialAction {
    Vote,
    Comment,
    DeleteComment,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SocialError {
    #[error("the race has not been saved")]
    RaceNotSaved,

    #[error("authentication required to {0:?}")]
    AuthRequired(SocialAction),

    #[error("comment text is empty")]
    EmptyComment,

    #[error("rejected: {}", .0.join(", "))]
    Rejected(Vec<String>),

    #[error(transparent)]
    Api(ApiError),
}

impl SocialError {
    /// user_message is the text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            SocialError::RaceNotSaved => "Save the race first to share it.".to_owned(),
            SocialError::AuthRequired(SocialAction::Vote) => {
                "You must have an account to vote.".to_owned()
            }
            SocialError::AuthRequired(SocialAction::Comment) => {
                "You must have an account to comment.".to_owned()
            }
            SocialError::AuthRequired(SocialAction::DeleteComment) => {
                "You must be logged in to delete comments.".to_owned()
            }
            SocialError::EmptyComment => "Write something first.".to_owned(),
            SocialError::Rejected(errors) => errors.join("\n"),
            SocialError::Api(_) => "Something went wrong, please try again.".to_owned(),
        }
    }

    fn from_api(action: SocialAction) -> impl Fn(ApiError) -> SocialError {
        move |err| match err {
            ApiError::AuthRequired => SocialError::AuthRequired(action),
            ApiError::Rejected(errors) => SocialError::Rejected(errors),
            other => SocialError::Api(other),
        }
    }
}

/// Social is the voting and commenting surface of one saved race.
pub struct Social<'a, A: RaceApi + ?Sized> {
    api: &'a A,
    race_public_id: String,
    notices: Vec<Sender<Notice>>,
}

impl<'a, A: RaceApi + ?Sized> Social<'a, A> {
    pub fn new(api: &'a A, race: &PersistedRace) -> Social<'a, A> {
        Social {
            api,
            race_public_id: race.race_public_id.to_owned(),
            notices: Vec::new(),
        }
    }

    /// with_notices sends a good-mood notice to every sender after a successful comment change.
    pub fn with_notices(mut self, notices: Vec<Sender<Notice>>) -> Social<'a, A> {
        self.notices = notices;
        self
    }

    pub fn race_public_id(&self) -> &str {
        &self.race_public_id
    }

    pub fn vote(&self, vote: Vote) -> Result<(), SocialError> {
        self.api
            .vote(&self.race_public_id, vote)
            .map_err(SocialError::from_api(SocialAction::Vote))
    }

    pub fn votes(&self) -> Result<VoteTally, SocialError> {
        self.api
            .votes(&self.race_public_id)
            .map_err(SocialError::from_api(SocialAction::Vote))
    }

    pub fn comments(&self) -> Result<Vec<Comment>, SocialError> {
        self.api
            .list_comments(&self.race_public_id)
            .map_err(SocialError::from_api(SocialAction::Comment))
    }

    pub fn add_comment(&self, text: &str) -> Result<(), SocialError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SocialError::EmptyComment);
        }
        self.api
            .add_comment(&self.race_public_id, text)
            .map_err(SocialError::from_api(SocialAction::Comment))?;
        self.notify(Notice::good("Successfully added comment!"));
        Ok(())
    }

    pub fn delete_comment(&self, comment_id: u64) -> Result<(), SocialError> {
        self.api
            .delete_comment(comment_id)
            .map_err(SocialError::from_api(SocialAction::DeleteComment))?;
        self.notify(Notice::good("Successfully deleted comment."));
        Ok(())
    }

    fn notify(&self, notice: Notice) {
        for tx in self.notices.iter() {
            // a dropped receiver just means nobody listens anymore
            let _ = tx.send(notice.clone());
        }
    }
}
