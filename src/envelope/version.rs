/// The two wire-incompatible SOAP versions this toolkit speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoapVersion {
    V1_1,
    V1_2,
}

impl SoapVersion {
    pub const NS_1_1: &'static str = "http://schemas.xmlsoap.org/soap/envelope/";
    pub const NS_1_2: &'static str = "http://www.w3.org/2003/05/soap-envelope";

    pub fn namespace_uri(self) -> &'static str {
        match self {
            SoapVersion::V1_1 => Self::NS_1_1,
            SoapVersion::V1_2 => Self::NS_1_2,
        }
    }

    /// The binding namespace a WSDL uses to signal this version (§4.5 step 5).
    pub fn wsdl_binding_namespace(self) -> &'static str {
        match self {
            SoapVersion::V1_1 => "http://schemas.xmlsoap.org/wsdl/soap/",
            SoapVersion::V1_2 => "http://schemas.xmlsoap.org/wsdl/soap12/",
        }
    }

    pub fn content_type(self, action: &str) -> String {
        match self {
            SoapVersion::V1_1 => "text/xml; charset=utf-8".to_string(),
            SoapVersion::V1_2 => {
                if action.is_empty() {
                    "application/soap+xml; charset=utf-8".to_string()
                } else {
                    format!("application/soap+xml; charset=utf-8; action=\"{action}\"")
                }
            }
        }
    }

    /// Detects which version's namespace URI is declared on an element's
    /// `xmlns:*` attributes, defaulting to 1.1 when neither is found (the
    /// most permissive choice for malformed or minimal documents).
    pub fn detect_from_namespace_uri(uri: &str) -> Option<SoapVersion> {
        match uri {
            Self::NS_1_1 => Some(SoapVersion::V1_1),
            Self::NS_1_2 => Some(SoapVersion::V1_2),
            _ => None,
        }
    }
}

impl std::fmt::Display for SoapVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SoapVersion::V1_1 => write!(f, "1.1"),
            SoapVersion::V1_2 => write!(f, "1.2"),
        }
    }
}
