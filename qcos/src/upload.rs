use crate::client::status_error;
use crate::part::{part_size_for, plan_parts};
use crate::xml::{parse_error, parse_upload_id};
use crate::{
    AbortMultipartUpload, Acl, Body, Client, CompleteMultipartUpload, InitiateMultipartUpload,
    ObjectLocation, Operation, PartDescriptor, PartResult, PartUploader, PutObject, Response,
};
use log::{debug, info, warn};
use qcos_core::{Error, Result};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Error codes of CompleteMultipartUpload that reject the submitted part list.
const PART_LIST_ERROR_CODES: &[&str] = &[
    "InvalidPart",
    "InvalidPartOrder",
    "EntityTooSmall",
    "NoSuchUpload",
    "MalformedXML",
];

/// Options of [`Client::upload`].
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Multipart threshold and minimum part size. Falls back to the client's.
    pub min_part_size: Option<u64>,
    /// Headers sent with every request of the upload.
    pub extra_params: BTreeMap<String, String>,
    /// Parts uploaded at the same time. Falls back to the client's.
    pub concurrency: Option<usize>,
    /// Cancels an in-flight multipart upload. The upload is aborted first.
    pub cancel: Option<CancellationToken>,
}

impl UploadOptions {
    /// Set the multipart threshold and minimum part size.
    pub fn with_min_part_size(mut self, size: u64) -> Self {
        self.min_part_size = Some(size);
        self
    }

    /// Add a header sent with every request of the upload.
    pub fn with_extra_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.insert(name.into(), value.into());
        self
    }

    /// Set the part upload concurrency.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Cancel the upload when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// What a multipart upload is going to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    location: ObjectLocation,
    total_size: u64,
    part_size: u64,
    acl: Acl,
    extra_params: BTreeMap<String, String>,
}

impl UploadPlan {
    /// Plan an upload of `total_size` bytes.
    ///
    /// The part size is never below `min_part_size`.
    pub fn new(
        location: ObjectLocation,
        total_size: u64,
        min_part_size: u64,
        acl: Acl,
        extra_params: BTreeMap<String, String>,
    ) -> Result<Self> {
        if min_part_size == 0 {
            return Err(Error::invalid_argument("min part size must be positive"));
        }
        Ok(Self {
            location,
            total_size,
            part_size: part_size_for(total_size, min_part_size),
            acl,
            extra_params,
        })
    }

    /// Bucket name.
    pub fn bucket(&self) -> &str {
        self.location.bucket()
    }

    /// Object key.
    pub fn key(&self) -> &str {
        self.location.key()
    }

    /// Size of the whole body.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Size of every part but the last.
    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    /// Canned ACL of the final object.
    pub fn acl(&self) -> Acl {
        self.acl
    }

    /// Headers sent with every request of the upload.
    pub fn extra_params(&self) -> &BTreeMap<String, String> {
        &self.extra_params
    }

    /// Parts tiling the whole body.
    pub fn parts(&self) -> Result<Vec<PartDescriptor>> {
        plan_parts(self.total_size, self.part_size)
    }

    /// Attach the extra params of this plan to `op`.
    pub fn with_extra_params(&self, op: Operation) -> Operation {
        self.extra_params
            .iter()
            .fold(op, |op, (k, v)| op.with_header(k, v))
    }
}

/// A multipart upload the service knows about.
#[derive(Debug, Clone)]
pub struct UploadSession {
    upload_id: String,
    plan: UploadPlan,
    completed_parts: BTreeMap<u32, PartResult>,
}

impl UploadSession {
    /// Create a session for an initiated upload.
    pub fn new(upload_id: impl Into<String>, plan: UploadPlan) -> Self {
        Self {
            upload_id: upload_id.into(),
            plan,
            completed_parts: BTreeMap::new(),
        }
    }

    /// Upload id assigned by the service.
    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Plan of this upload.
    pub fn plan(&self) -> &UploadPlan {
        &self.plan
    }

    /// Record an uploaded part. A later result for the same part replaces
    /// the earlier one.
    pub fn record(&mut self, part: PartResult) -> Result<()> {
        let expected = self.plan.total_size.div_ceil(self.plan.part_size);
        if part.index == 0 || u64::from(part.index) > expected {
            return Err(Error::unexpected(format!(
                "part {} is outside of 1..={expected}",
                part.index
            )));
        }
        self.completed_parts.insert(part.index, part);
        Ok(())
    }

    /// Uploaded parts ordered by index.
    pub fn completed_parts(&self) -> Vec<PartResult> {
        self.completed_parts.values().cloned().collect()
    }

    /// Whether every planned part has been uploaded.
    pub fn is_complete(&self) -> bool {
        self.completed_parts.len() as u64 == self.plan.total_size.div_ceil(self.plan.part_size)
    }
}

/// States of one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// Measuring the body.
    Sizing,
    /// Uploading with a single PutObject.
    Simple,
    /// Waiting for an upload id.
    Initiating,
    /// Uploading parts.
    Uploading,
    /// Submitting the part list.
    Completing,
    /// The object exists.
    Done,
    /// Releasing the parts after a failure or cancellation.
    Aborting,
    /// The upload is gone.
    Aborted,
}

impl UploadState {
    /// Check whether `next` may follow this state.
    pub fn can_advance_to(self, next: UploadState) -> bool {
        use UploadState::*;

        matches!(
            (self, next),
            (Sizing, Simple)
                | (Sizing, Initiating)
                | (Initiating, Uploading)
                | (Uploading, Completing)
                | (Uploading, Aborting)
                | (Completing, Done)
                | (Completing, Aborting)
                | (Aborting, Aborted)
        )
    }

    /// Whether the upload is over.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UploadState::Simple | UploadState::Done | UploadState::Aborted
        )
    }
}

impl Display for UploadState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl Client {
    /// Upload `body` to `bucket/key`.
    ///
    /// Bodies up to the minimum part size go out as one PutObject, larger
    /// ones as a multipart upload. A failed or cancelled multipart upload is
    /// aborted before the error is returned.
    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        body: impl Into<Body>,
        acl: Acl,
        opts: UploadOptions,
    ) -> Result<Response> {
        let body = body.into();
        let location = ObjectLocation::new(bucket, key)
            .map_err(|e| Error::invalid_argument(e.message().to_string()))?;
        let min_part_size = opts.min_part_size.unwrap_or(self.min_part_size());
        if min_part_size == 0 {
            return Err(Error::invalid_argument("min part size must be positive"));
        }

        let mut upload = Multipart {
            client: self,
            state: UploadState::Sizing,
            cancel: opts.cancel.unwrap_or_default(),
        };

        let total_size = body.size(self.context()).await?;
        let plan = UploadPlan::new(
            location,
            total_size,
            min_part_size,
            acl,
            opts.extra_params,
        )?;

        if total_size <= min_part_size {
            upload.advance(UploadState::Simple);
            return self.put_object_simple(&plan, &body).await;
        }

        let concurrency = opts
            .concurrency
            .unwrap_or(self.upload_concurrency())
            .max(1);
        upload.run(plan, body, concurrency).await
    }

    async fn put_object_simple(&self, plan: &UploadPlan, body: &Body) -> Result<Response> {
        let content = body.read_range(self.context(), 0, plan.total_size()).await?;
        let op = PutObject::new(plan.bucket(), plan.key(), content)?.with_acl(plan.acl());
        let req = self.execute_operation(plan.with_extra_params(op.into()))?;
        self.dispatch(req).await
    }

    /// Start a multipart upload for `plan`.
    pub async fn initiate_multipart_upload(&self, plan: UploadPlan) -> Result<UploadSession> {
        let op = InitiateMultipartUpload::new(plan.bucket(), plan.key())?.with_acl(plan.acl());
        let req = self.execute_operation(plan.with_extra_params(op.into()))?;
        let resp = self.dispatch(req).await?;

        let upload_id = parse_upload_id(resp.body())?;
        debug!(
            "initiated upload {upload_id} of {} bytes into {}/{}",
            plan.total_size(),
            plan.bucket(),
            plan.key()
        );
        Ok(UploadSession::new(upload_id, plan))
    }

    /// Submit the part list of `session`.
    ///
    /// Refuses to send anything unless every planned part is recorded. An
    /// error code rejecting the part list, or an error document in a 2xx
    /// response, is a `CompletionMismatch`. Any other failure is a
    /// `Dispatch` error.
    pub async fn complete_multipart_upload(&self, session: &UploadSession) -> Result<Response> {
        if !session.is_complete() {
            return Err(Error::unexpected(format!(
                "upload {} still misses parts",
                session.upload_id()
            )));
        }

        let op = CompleteMultipartUpload::new(
            session.plan().bucket(),
            session.plan().key(),
            session.upload_id(),
            session.completed_parts(),
        )?;
        let req = self.execute_operation(session.plan().with_extra_params(op.into()))?;
        let resp = self.send(req).await?;

        let status = resp.status();
        let service_error = parse_error(resp.body());
        let rejected = match &service_error {
            Some(se) => status.is_success() || PART_LIST_ERROR_CODES.contains(&se.code.as_str()),
            None => false,
        };
        if rejected {
            let err = Error::completion_mismatch(format!(
                "service rejected the part list of upload {} with status {status}",
                session.upload_id()
            ));
            return Err(match service_error {
                Some(se) => err.with_source(se),
                None => err,
            });
        }
        if !status.is_success() {
            return Err(status_error("CompleteMultipartUpload", &resp));
        }
        Ok(resp)
    }

    /// Abort `session` and release its parts.
    pub async fn abort_multipart_upload(&self, session: &UploadSession) -> Result<()> {
        let op = AbortMultipartUpload::new(
            session.plan().bucket(),
            session.plan().key(),
            session.upload_id(),
        )?;
        let req = self.execute_operation(session.plan().with_extra_params(op.into()))?;
        self.dispatch(req).await.map_err(|e| {
            Error::abort_failed(format!("failed to abort upload {}", session.upload_id()))
                .with_source(e)
        })?;
        Ok(())
    }
}

/// Drives one multipart upload through its states.
struct Multipart<'a> {
    client: &'a Client,
    state: UploadState,
    cancel: CancellationToken,
}

impl Multipart<'_> {
    fn advance(&mut self, next: UploadState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal upload transition {} -> {next}",
            self.state
        );
        debug!("upload state {} -> {next}", self.state);
        self.state = next;
    }

    async fn run(mut self, plan: UploadPlan, body: Body, concurrency: usize) -> Result<Response> {
        self.advance(UploadState::Initiating);
        let mut session = self.client.initiate_multipart_upload(plan).await?;

        self.advance(UploadState::Uploading);
        if self.cancel.is_cancelled() {
            return Err(self
                .abort(&session, Error::cancelled("upload cancelled"))
                .await);
        }

        let parts = match session.plan().parts() {
            Ok(parts) => parts,
            Err(err) => return Err(self.abort(&session, err).await),
        };
        let uploader = PartUploader::new(self.client.clone(), session.clone(), body);
        let uploaded = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::cancelled("upload cancelled")),
            r = upload_parts(uploader, parts, concurrency) => r,
        };
        let recorded = uploaded.and_then(|parts| {
            parts
                .into_values()
                .try_for_each(|part| session.record(part))
        });
        if let Err(err) = recorded {
            return Err(self.abort(&session, err).await);
        }

        self.advance(UploadState::Completing);
        let completed = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::cancelled("upload cancelled")),
            r = self.client.complete_multipart_upload(&session) => r,
        };
        match completed {
            Ok(resp) => {
                self.advance(UploadState::Done);
                info!(
                    "completed upload {} of {} bytes in {} parts into {}/{}",
                    session.upload_id(),
                    session.plan().total_size(),
                    session.completed_parts.len(),
                    session.plan().bucket(),
                    session.plan().key()
                );
                Ok(resp)
            }
            Err(err) => Err(self.abort(&session, err).await),
        }
    }

    /// Abort the session, keeping `err` as the error to report.
    async fn abort(&mut self, session: &UploadSession, err: Error) -> Error {
        self.advance(UploadState::Aborting);
        let err = match self.client.abort_multipart_upload(session).await {
            Ok(()) => err,
            Err(abort_err) => {
                warn!("{abort_err}, keeping original error: {err}");
                err.with_abort_error(abort_err)
            }
        };
        self.advance(UploadState::Aborted);
        err
    }
}

/// Upload every part with a pool of `concurrency` workers.
///
/// Workers pull descriptors from a shared queue and send results over a
/// channel; only this function touches the result map. The first failure
/// is returned right away and the remaining workers are dropped.
async fn upload_parts(
    uploader: PartUploader,
    parts: Vec<PartDescriptor>,
    concurrency: usize,
) -> Result<BTreeMap<u32, PartResult>> {
    let expected = parts.len();
    let uploader = Arc::new(uploader);
    let queue = Arc::new(Mutex::new(parts.into_iter()));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut workers = JoinSet::new();
    for _ in 0..concurrency.min(expected).max(1) {
        let uploader = uploader.clone();
        let queue = queue.clone();
        let tx = tx.clone();
        workers.spawn(async move {
            loop {
                let next = queue.lock().expect("part queue lock poisoned").next();
                let Some(part) = next else {
                    break;
                };
                let result = uploader.upload(part).await;
                let failed = result.is_err();
                if tx.send(result).is_err() || failed {
                    break;
                }
            }
        });
    }
    drop(tx);

    let mut completed = BTreeMap::new();
    while let Some(result) = rx.recv().await {
        let part = result?;
        completed.insert(part.index, part);
    }
    if completed.len() != expected {
        return Err(Error::unexpected(format!(
            "only {} of {expected} parts finished",
            completed.len()
        )));
    }
    Ok(completed)
}
