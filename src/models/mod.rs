mod url;

pub use self::url::{
    normalize_original_url, CreateUrlRequest, LinkRecord, LinkResponse, ShortCode, UrlError,
    ALPHABET,
};
