mod http_media_downloader;

pub use http_media_downloader::HttpMediaDownloader;
