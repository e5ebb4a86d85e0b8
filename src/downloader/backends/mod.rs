// Downloader backends

pub mod n_m3u8dl;
pub mod ytdlp;

pub use n_m3u8dl::NM3u8DlBackend;
pub use ytdlp::YtDlpBackend;
