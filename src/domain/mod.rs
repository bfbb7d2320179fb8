// Domain layer: crawl models and the ports the crawler drives (browser page, result sink).

pub mod model;
pub mod ports;
