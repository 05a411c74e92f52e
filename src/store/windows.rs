//! store::windows
//!
//! Windows data protection and credential manager queries.
//!
//! On other platforms every function reports "unavailable" so callers
//! need no `cfg` of their own.

use super::traits::StoreError;

/// Whether the Windows Credential Manager can persist generic credentials
/// in the current logon session.
#[cfg(windows)]
pub fn can_persist_credentials() -> bool {
    use winapi::um::wincred::{
        CredGetSessionTypes, CRED_PERSIST_LOCAL_MACHINE, CRED_TYPE_GENERIC, CRED_TYPE_MAXIMUM,
    };

    let mut persist = [0u32; CRED_TYPE_MAXIMUM as usize];
    let ok = unsafe { CredGetSessionTypes(CRED_TYPE_MAXIMUM, persist.as_mut_ptr()) };
    if ok == 0 {
        let error_code = unsafe { winapi::um::errhandlingapi::GetLastError() };
        log::debug!("CredGetSessionTypes failed, error code: {}", error_code);
        return false;
    }
    persist[CRED_TYPE_GENERIC as usize] >= CRED_PERSIST_LOCAL_MACHINE
}

#[cfg(not(windows))]
pub fn can_persist_credentials() -> bool {
    false
}

/// Encrypt bytes for the current user with DPAPI.
#[cfg(windows)]
pub fn protect(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    use winapi::um::dpapi::{CryptProtectData, CRYPTPROTECT_UI_FORBIDDEN};

    dpapi_call("protect", data, |input, output| unsafe {
        CryptProtectData(
            input,
            std::ptr::null(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            CRYPTPROTECT_UI_FORBIDDEN,
            output,
        )
    })
}

/// Decrypt bytes produced by [`protect`] for the current user.
#[cfg(windows)]
pub fn unprotect(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    use winapi::um::dpapi::{CryptUnprotectData, CRYPTPROTECT_UI_FORBIDDEN};

    dpapi_call("unprotect", data, |input, output| unsafe {
        CryptUnprotectData(
            input,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            CRYPTPROTECT_UI_FORBIDDEN,
            output,
        )
    })
}

#[cfg(windows)]
fn dpapi_call<F>(what: &str, data: &[u8], call: F) -> Result<Vec<u8>, StoreError>
where
    F: FnOnce(
        *mut winapi::um::wincrypt::DATA_BLOB,
        *mut winapi::um::wincrypt::DATA_BLOB,
    ) -> winapi::shared::minwindef::BOOL,
{
    use winapi::um::wincrypt::DATA_BLOB;
    use winapi::um::winbase::LocalFree;

    let mut input = DATA_BLOB {
        cbData: data.len() as u32,
        pbData: data.as_ptr() as *mut u8,
    };
    let mut output = DATA_BLOB {
        cbData: 0,
        pbData: std::ptr::null_mut(),
    };

    if call(&mut input, &mut output) == 0 {
        let error_code = unsafe { winapi::um::errhandlingapi::GetLastError() };
        return Err(StoreError::ReadError(format!(
            "DPAPI {} failed, error code: {}",
            what, error_code
        )));
    }

    let bytes = unsafe {
        let bytes = std::slice::from_raw_parts(output.pbData, output.cbData as usize).to_vec();
        LocalFree(output.pbData as *mut _);
        bytes
    };
    Ok(bytes)
}

#[cfg(not(windows))]
pub fn protect(_data: &[u8]) -> Result<Vec<u8>, StoreError> {
    Err(StoreError::Unavailable("DPAPI is only available on Windows".into()))
}

#[cfg(not(windows))]
pub fn unprotect(_data: &[u8]) -> Result<Vec<u8>, StoreError> {
    Err(StoreError::Unavailable("DPAPI is only available on Windows".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn unavailable_off_windows() {
        assert!(!can_persist_credentials());
        assert!(matches!(protect(b"x"), Err(StoreError::Unavailable(_))));
        assert!(matches!(unprotect(b"x"), Err(StoreError::Unavailable(_))));
    }

    #[cfg(windows)]
    #[test]
    fn protect_round_trip() {
        let sealed = protect(b"s3cr3t").expect("protect");
        assert_ne!(sealed, b"s3cr3t");
        assert_eq!(unprotect(&sealed).expect("unprotect"), b"s3cr3t");
    }
}
