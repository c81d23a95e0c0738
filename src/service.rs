use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use tonic::transport::Server;
use tonic::{Request, Response, Status, async_trait};

use crate::analyzer::{AnalysisRequest, Analyzer};
use crate::error::Error;
use crate::grpc::agri_vision_server::{AgriVision, AgriVisionServer};
use crate::grpc::{AnalyzeRequest, CropReply, HealthReply, HealthRequest, SoilReply};

/// Headroom over the image limit for the rest of the request message.
const MESSAGE_OVERHEAD_BYTES: usize = 64 * 1024;

/// The analysis gRPC service. Scoring is CPU-bound and runs on the blocking
/// pool so it does not stall the reactor.
#[derive(Clone)]
pub struct AgriVisionService {
    analyzer: Arc<Analyzer>,
}

impl fmt::Debug for AgriVisionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgriVisionService")
            .field("analyzer", &self.analyzer)
            .finish()
    }
}

impl AgriVisionService {
    pub fn new(analyzer: Arc<Analyzer>) -> Self {
        Self { analyzer }
    }
}

/// Bad uploads are the caller's fault; everything else is ours.
pub fn to_status(err: Error) -> Status {
    if err.is_client_error() {
        Status::invalid_argument(err.to_string())
    } else {
        tracing::error!(error = %err, "Analysis failed");
        Status::internal(err.to_string())
    }
}

async fn run_blocking<T, F>(analyzer: Arc<Analyzer>, f: F) -> Result<T, Status>
where
    T: Send + 'static,
    F: FnOnce(&Analyzer) -> crate::error::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&analyzer))
        .await
        .map_err(|e| Status::internal(format!("Analysis task failed: {}", e)))?
        .map_err(to_status)
}

#[async_trait]
impl AgriVision for AgriVisionService {
    async fn analyze_soil(
        &self,
        request: Request<AnalyzeRequest>,
    ) -> Result<Response<SoilReply>, Status> {
        let req = AnalysisRequest::from(request.into_inner());
        let response =
            run_blocking(Arc::clone(&self.analyzer), move |a| a.analyze_soil(&req)).await?;
        Ok(Response::new(response.into()))
    }

    async fn analyze_crop(
        &self,
        request: Request<AnalyzeRequest>,
    ) -> Result<Response<CropReply>, Status> {
        let req = AnalysisRequest::from(request.into_inner());
        let response =
            run_blocking(Arc::clone(&self.analyzer), move |a| a.analyze_crop(&req)).await?;
        Ok(Response::new(response.into()))
    }

    async fn health(
        &self,
        _request: Request<HealthRequest>,
    ) -> Result<Response<HealthReply>, Status> {
        Ok(Response::new(self.analyzer.health().into()))
    }
}

/// Serve until the process is stopped.
pub async fn serve(analyzer: Analyzer, addr: SocketAddr) -> anyhow::Result<()> {
    let max_message = analyzer.max_upload_bytes() + MESSAGE_OVERHEAD_BYTES;
    let service = AgriVisionService::new(Arc::new(analyzer));
    tracing::info!(%addr, model = service.analyzer.has_model(), "AgriVision server listening");

    Server::builder()
        .add_service(AgriVisionServer::new(service).max_decoding_message_size(max_message))
        .serve(addr)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::solid_png;

    fn service() -> AgriVisionService {
        AgriVisionService::new(Arc::new(Analyzer::default()))
    }

    #[tokio::test]
    async fn test_analyze_soil_rpc() {
        let request = AnalyzeRequest {
            image_data: solid_png([180, 80, 60], 24).unwrap(),
            content_type: Some("image/png".into()),
            ..Default::default()
        };
        let reply = service().analyze_soil(Request::new(request)).await.unwrap().into_inner();
        assert_eq!(reply.status, "success");
        assert!(reply.location.is_none());
        assert!(reply.result.is_some());
    }

    #[tokio::test]
    async fn test_bad_upload_is_invalid_argument() {
        let request = AnalyzeRequest {
            image_data: b"not an image".to_vec(),
            ..Default::default()
        };
        let status = service().analyze_crop(Request::new(request)).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status = service()
            .analyze_soil(Request::new(AnalyzeRequest::default()))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn test_internal_errors_map_to_internal() {
        assert_eq!(to_status(Error::Model("boom".into())).code(), tonic::Code::Internal);
    }

    #[tokio::test]
    async fn test_health_rpc() {
        let reply = service().health(Request::new(HealthRequest {})).await.unwrap().into_inner();
        assert_eq!(reply.status, "healthy");
        assert_eq!(reply.capabilities.len(), 2);
    }
}
