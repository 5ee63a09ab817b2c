mod external;
mod health;
mod metrics;
mod proxy;
mod verify;

pub use external::{
    get_work_request, list_divisions, list_work_requests, list_zones, work_request_before_content,
    work_request_images, work_request_videos,
};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use proxy::{divisions_proxy, search_work_requests_proxy, verify_work_request_proxy, zones_proxy};
pub use verify::verify_work_request;
