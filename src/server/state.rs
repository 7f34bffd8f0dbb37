use std::time::Duration;

use crate::pipeline::Pipeline;

pub struct ServerState<F, C, E> {
    pub pipeline: Pipeline<F, C, E>,
    /// Per-request budget; `None` lets a request run until the engines answer.
    pub request_timeout: Option<Duration>,
}

impl<F, C, E> ServerState<F, C, E> {
    pub fn new(pipeline: Pipeline<F, C, E>, request_timeout: Option<Duration>) -> Self {
        Self {
            pipeline,
            request_timeout,
        }
    }
}
