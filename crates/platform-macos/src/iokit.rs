//! Display product names from the IOKit registry.

use std::os::raw::{c_char, c_void};

use core_foundation::base::TCFType;
use core_foundation::dictionary::{CFDictionary, CFDictionaryGetValue, CFDictionaryRef};
use core_foundation::number::{CFNumber, CFNumberRef};
use core_foundation::string::{CFString, CFStringRef};

use crate::services::DisplayId;

#[allow(non_camel_case_types, non_upper_case_globals)]
mod ffi {
    use std::os::raw::c_char;

    use core_foundation::dictionary::{CFDictionaryRef, CFMutableDictionaryRef};

    pub type kern_return_t = i32;
    pub type mach_port_t = u32;
    pub type io_object_t = mach_port_t;
    pub type io_iterator_t = io_object_t;
    pub type io_service_t = io_object_t;
    pub type IOOptionBits = u32;

    pub const KERN_SUCCESS: kern_return_t = 0;
    pub const kIOMainPortDefault: mach_port_t = 0;
    pub const kIODisplayOnlyPreferredName: IOOptionBits = 0x0000_0200;

    #[link(name = "IOKit", kind = "framework")]
    extern "C" {
        pub fn IOServiceMatching(name: *const c_char) -> CFMutableDictionaryRef;
        pub fn IOServiceGetMatchingServices(
            main_port: mach_port_t,
            matching: CFDictionaryRef,
            existing: *mut io_iterator_t,
        ) -> kern_return_t;
        pub fn IOIteratorNext(iterator: io_iterator_t) -> io_object_t;
        pub fn IOObjectRelease(object: io_object_t) -> kern_return_t;
        pub fn IODisplayCreateInfoDictionary(
            framebuffer: io_service_t,
            options: IOOptionBits,
        ) -> CFDictionaryRef;
    }

    #[link(name = "CoreGraphics", kind = "framework")]
    extern "C" {
        pub fn CGDisplayVendorNumber(display: u32) -> u32;
        pub fn CGDisplayModelNumber(display: u32) -> u32;
    }
}

const DISPLAY_CONNECT_CLASS: &[u8] = b"IODisplayConnect\0";
const VENDOR_ID_KEY: &str = "DisplayVendorID";
const PRODUCT_ID_KEY: &str = "DisplayProductID";
const PRODUCT_NAME_KEY: &str = "DisplayProductName";

/// An IOKit object reference, released on drop.
struct IoObject(ffi::io_object_t);

impl Drop for IoObject {
    fn drop(&mut self) {
        unsafe { ffi::IOObjectRelease(self.0) };
    }
}

/// Iterator over matching IOKit services.
struct Services(IoObject);

impl Services {
    fn matching(class: &'static [u8]) -> Option<Self> {
        let mut iterator = 0;
        let status = unsafe {
            // The matching dictionary is consumed by the lookup.
            let matching = ffi::IOServiceMatching(class.as_ptr() as *const c_char);
            ffi::IOServiceGetMatchingServices(ffi::kIOMainPortDefault, matching, &mut iterator)
        };
        if status != ffi::KERN_SUCCESS {
            tracing::debug!(status, "IOServiceGetMatchingServices failed");
            return None;
        }
        Some(Self(IoObject(iterator)))
    }
}

impl Iterator for Services {
    type Item = IoObject;

    fn next(&mut self) -> Option<IoObject> {
        match unsafe { ffi::IOIteratorNext((self.0).0) } {
            0 => None,
            service => Some(IoObject(service)),
        }
    }
}

fn dictionary_value(dict: CFDictionaryRef, key: &str) -> *const c_void {
    let key = CFString::new(key);
    unsafe { CFDictionaryGetValue(dict, key.as_concrete_TypeRef() as *const c_void) }
}

fn dictionary_number(dict: CFDictionaryRef, key: &str) -> Option<i64> {
    let value = dictionary_value(dict, key);
    if value.is_null() {
        return None;
    }
    let number: CFNumber = unsafe { TCFType::wrap_under_get_rule(value as CFNumberRef) };
    number.to_i64()
}

/// Localized product name of the display connected to `display`.
///
/// Headless Macs and some adapters publish no name.
pub fn display_product_name(display: DisplayId, locale: &str) -> Option<String> {
    let vendor = unsafe { ffi::CGDisplayVendorNumber(display) } as i64;
    let model = unsafe { ffi::CGDisplayModelNumber(display) } as i64;

    for service in Services::matching(DISPLAY_CONNECT_CLASS)? {
        let raw = unsafe {
            ffi::IODisplayCreateInfoDictionary(service.0, ffi::kIODisplayOnlyPreferredName)
        };
        if raw.is_null() {
            continue;
        }
        let info: CFDictionary = unsafe { TCFType::wrap_under_create_rule(raw) };
        let info_ref = info.as_concrete_TypeRef();

        if dictionary_number(info_ref, VENDOR_ID_KEY) != Some(vendor)
            || dictionary_number(info_ref, PRODUCT_ID_KEY) != Some(model)
        {
            continue;
        }

        let names = dictionary_value(info_ref, PRODUCT_NAME_KEY);
        if names.is_null() {
            return None;
        }
        let name = dictionary_value(names as CFDictionaryRef, locale);
        if name.is_null() {
            return None;
        }
        let name: CFString = unsafe { TCFType::wrap_under_get_rule(name as CFStringRef) };
        return Some(name.to_string());
    }

    None
}
