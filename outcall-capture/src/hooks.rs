use std::fmt;

use outcall_protocol::Event;
use serde_json::Value;

use crate::adapter::{BaseRequest, BaseResponse};

/// A type-erased error returned by hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type ValueHook =
    Box<dyn Fn(BaseRequest<'_>, BaseResponse<'_>) -> Result<Value, BoxError> + Send + Sync>;
type IdHook =
    Box<dyn Fn(BaseRequest<'_>, BaseResponse<'_>) -> Result<Option<String>, BoxError> + Send + Sync>;
type SkipHook =
    Box<dyn Fn(BaseRequest<'_>, BaseResponse<'_>) -> Result<bool, BoxError> + Send + Sync>;
type MaskHook = Box<dyn Fn(Event) -> Result<Event, BoxError> + Send + Sync>;

/// Identifies a hook in errors and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// See [`Hooks::metadata`].
    Metadata,
    /// See [`Hooks::identify_user`].
    IdentifyUser,
    /// See [`Hooks::identify_company`].
    IdentifyCompany,
    /// See [`Hooks::identify_session`].
    IdentifySession,
    /// See [`Hooks::skip`].
    Skip,
    /// See [`Hooks::mask`].
    Mask,
}

impl HookKind {
    /// Returns the name of the hook.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::IdentifyUser => "identify_user",
            Self::IdentifyCompany => "identify_company",
            Self::IdentifySession => "identify_session",
            Self::Skip => "skip",
            Self::Mask => "mask",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook failed and aborted the capture.
#[derive(Debug, thiserror::Error)]
#[error("{hook} hook failed")]
pub struct HookError {
    /// The failing hook.
    pub hook: HookKind,
    /// The error returned by the hook.
    #[source]
    pub source: BoxError,
}

impl HookError {
    fn new(hook: HookKind) -> impl FnOnce(BoxError) -> Self {
        move |source| Self { hook, source }
    }
}

/// Callbacks supplied by the application to enrich, filter, and redact events.
///
/// All hooks are optional. Enrichment hooks receive the native request and response of the call.
///
/// ```
/// use outcall_capture::{BaseRequest, Hooks};
///
/// let hooks = Hooks::new()
///     .identify_user(|request, _| {
///         let BaseRequest::Http(request) = request else {
///             return Ok(None);
///         };
///         let user = request.headers().get("x-user-id");
///         Ok(user.and_then(|v| v.to_str().ok()).map(str::to_owned))
///     })
///     .skip(|_, response| Ok(matches!(response, outcall_capture::BaseResponse::Transfer(_))));
/// ```
#[derive(Default)]
pub struct Hooks {
    metadata: Option<ValueHook>,
    identify_user: Option<IdHook>,
    identify_company: Option<IdHook>,
    identify_session: Option<IdHook>,
    skip: Option<SkipHook>,
    mask: Option<MaskHook>,
}

impl Hooks {
    /// Creates an empty set of hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes arbitrary metadata attached to the event.
    ///
    /// Returning JSON `null` leaves the metadata unset.
    pub fn metadata<F>(mut self, hook: F) -> Self
    where
        F: Fn(BaseRequest<'_>, BaseResponse<'_>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.metadata = Some(Box::new(hook));
        self
    }

    /// Identifies the user on whose behalf the call was made.
    pub fn identify_user<F>(mut self, hook: F) -> Self
    where
        F: Fn(BaseRequest<'_>, BaseResponse<'_>) -> Result<Option<String>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.identify_user = Some(Box::new(hook));
        self
    }

    /// Identifies the company on whose behalf the call was made.
    pub fn identify_company<F>(mut self, hook: F) -> Self
    where
        F: Fn(BaseRequest<'_>, BaseResponse<'_>) -> Result<Option<String>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.identify_company = Some(Box::new(hook));
        self
    }

    /// Identifies the session the call belongs to.
    pub fn identify_session<F>(mut self, hook: F) -> Self
    where
        F: Fn(BaseRequest<'_>, BaseResponse<'_>) -> Result<Option<String>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.identify_session = Some(Box::new(hook));
        self
    }

    /// Decides whether a call is excluded from capture.
    pub fn skip<F>(mut self, hook: F) -> Self
    where
        F: Fn(BaseRequest<'_>, BaseResponse<'_>) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        self.skip = Some(Box::new(hook));
        self
    }

    /// Rewrites or redacts an event before it is sampled and sent.
    pub fn mask<F>(mut self, hook: F) -> Self
    where
        F: Fn(Event) -> Result<Event, BoxError> + Send + Sync + 'static,
    {
        self.mask = Some(Box::new(hook));
        self
    }

    /// Runs the enrichment hooks in order and stores their results on the event.
    pub(crate) fn enrich(
        &self,
        event: &mut Event,
        request: BaseRequest<'_>,
        response: BaseResponse<'_>,
    ) -> Result<(), HookError> {
        if let Some(ref hook) = self.metadata {
            let metadata = hook(request, response).map_err(HookError::new(HookKind::Metadata))?;
            event.metadata = Some(metadata).filter(|value| !value.is_null());
        }

        let identifiers = [
            (&self.identify_user, HookKind::IdentifyUser, &mut event.user_id),
            (&self.identify_company, HookKind::IdentifyCompany, &mut event.company_id),
            (&self.identify_session, HookKind::IdentifySession, &mut event.session_token),
        ];

        for (hook, kind, field) in identifiers {
            if let Some(hook) = hook {
                *field = hook(request, response).map_err(HookError::new(kind))?;
            }
        }

        Ok(())
    }

    /// Returns `true` if the skip hook excludes the call.
    pub(crate) fn should_skip(
        &self,
        request: BaseRequest<'_>,
        response: BaseResponse<'_>,
    ) -> Result<bool, HookError> {
        match self.skip {
            Some(ref hook) => hook(request, response).map_err(HookError::new(HookKind::Skip)),
            None => Ok(false),
        }
    }

    /// Applies the mask hook, if any.
    pub(crate) fn mask_event(&self, event: Event) -> Result<Event, HookError> {
        match self.mask {
            Some(ref hook) => hook(event).map_err(HookError::new(HookKind::Mask)),
            None => Ok(event),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("metadata", &self.metadata.is_some())
            .field("identify_user", &self.identify_user.is_some())
            .field("identify_company", &self.identify_company.is_some())
            .field("identify_session", &self.identify_session.is_some())
            .field("skip", &self.skip.is_some())
            .field("mask", &self.mask.is_some())
            .finish()
    }
}
