//! Activity API client built on `NetworkService`.
//!
//! # Design
//! `ActivityClient` only names endpoints and result types; everything else is
//! the transport's job. Failures with a non-2xx status are promoted into
//! `NetworkError::RequestFailedWithMessage` here, at the caller boundary, so
//! the UI can show the server's message.

use crate::array::ArrayOf;
use crate::error::NetworkError;
use crate::request::Request;
use crate::service::{NetworkService, RequestTask};
use crate::types::{Activity, ActivityPatch, NewActivity};

/// Relative paths of the activity API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Activities,
    Activity(u64),
}

impl Endpoint {
    pub fn path(self) -> String {
        match self {
            Endpoint::Activities => "/activities".to_string(),
            Endpoint::Activity(id) => format!("/activities/{id}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivityClient {
    transport: NetworkService,
}

impl ActivityClient {
    pub fn new(transport: NetworkService) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &NetworkService {
        &self.transport
    }

    pub async fn list_activities(&self) -> Result<Vec<Activity>, NetworkError> {
        self.transport
            .fetch_array::<ArrayOf<Activity>>(Request::get(Endpoint::Activities.path()))
            .await
            .map(ArrayOf::into_vec)
            .map_err(NetworkError::with_response_message)
    }

    /// Callback form of `list_activities`; `completion` runs on the main
    /// context.
    pub fn list_activities_with<F>(&self, completion: F) -> Option<RequestTask>
    where
        F: FnOnce(Result<Vec<Activity>, NetworkError>) + Send + 'static,
    {
        self.transport.request_array::<ArrayOf<Activity>, _>(
            Request::get(Endpoint::Activities.path()),
            move |result| {
                completion(
                    result
                        .map(ArrayOf::into_vec)
                        .map_err(NetworkError::with_response_message),
                )
            },
        )
    }

    pub async fn get_activity(&self, id: u64) -> Result<Activity, NetworkError> {
        self.transport
            .fetch(Request::get(Endpoint::Activity(id).path()))
            .await
            .map_err(NetworkError::with_response_message)
    }

    pub async fn create_activity(&self, input: &NewActivity) -> Result<Activity, NetworkError> {
        let request = Request::post(Endpoint::Activities.path()).body(input.clone());
        self.transport
            .fetch(request)
            .await
            .map_err(NetworkError::with_response_message)
    }

    pub async fn update_activity(
        &self,
        id: u64,
        patch: &ActivityPatch,
    ) -> Result<Activity, NetworkError> {
        let request = Request::put(Endpoint::Activity(id).path()).body(patch.clone());
        self.transport
            .fetch(request)
            .await
            .map_err(NetworkError::with_response_message)
    }

    /// Delete an activity, returning the removed record.
    pub async fn delete_activity(&self, id: u64) -> Result<Activity, NetworkError> {
        self.transport
            .fetch(Request::delete(Endpoint::Activity(id).path()))
            .await
            .map_err(NetworkError::with_response_message)
    }
}
