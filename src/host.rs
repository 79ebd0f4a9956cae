//! Local host identity for the greeting line.

use tracing::warn;

const FALLBACK_HOSTNAME: &str = "localhost";

/// Host name of this machine, or `localhost` if it cannot be read.
pub fn local_hostname() -> String {
    let mut buf = [0u8; 256];

    // SAFETY: buf is valid for writes of buf.len() bytes.
    let ret = unsafe { libc::gethostname(buf.as_mut_ptr().cast::<libc::c_char>(), buf.len()) };
    if ret != 0 {
        warn!(
            error = %std::io::Error::last_os_error(),
            "gethostname failed, using fallback"
        );
        return FALLBACK_HOSTNAME.to_string();
    }

    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    match std::str::from_utf8(&buf[..len]) {
        Ok(name) if !name.is_empty() => name.to_string(),
        _ => FALLBACK_HOSTNAME.to_string(),
    }
}
