use base64::{Engine, engine::general_purpose::STANDARD};
use icy_carousel::{RESOURCE_URL_PREFIX, ResourceStore};

/// Replace every resource handle URL in `html` with a `data:` URI so the page
/// stands on its own. Unknown handles are left as they are.
pub fn inline_resources(html: &str, store: &ResourceStore) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find(RESOURCE_URL_PREFIX) {
        out.push_str(&rest[..start]);
        let tail = &rest[start + RESOURCE_URL_PREFIX.len()..];
        let digits = tail.bytes().take_while(u8::is_ascii_digit).count();
        let url = &rest[start..start + RESOURCE_URL_PREFIX.len() + digits];

        match store.resolve(url) {
            Some(resource) if digits > 0 => {
                let mime = resource.mime.as_deref().unwrap_or("application/octet-stream");
                out.push_str("data:");
                out.push_str(mime);
                out.push_str(";base64,");
                out.push_str(&STANDARD.encode(resource.data.as_slice()));
            }
            _ => out.push_str(url),
        }
        rest = &rest[start + url.len()..];
    }
    out.push_str(rest);
    out
}
