use serde::{Deserialize, Serialize};

/// A SOAP 1.1 fault
///
/// Operation traits return it as their error; the generated server maps
/// malformed requests to [`SoapFault::client`] and response encoding failures
/// to [`SoapFault::server`].
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct SoapFault {
    #[serde(rename = "faultcode")]
    pub code: String,
    #[serde(rename = "faultstring")]
    pub message: String,
    #[serde(rename = "faultactor", default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(rename = "detail", default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SoapFault {
    pub const CLIENT: &'static str = "soap:Client";
    pub const SERVER: &'static str = "soap:Server";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            actor: None,
            detail: None,
        }
    }

    /// The request was malformed or cannot be processed as sent
    pub fn client(message: impl Into<String>) -> Self {
        Self::new(Self::CLIENT, message)
    }

    /// The service failed while processing a valid request
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(Self::SERVER, message)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// The `soap:Fault` element for a response body
    pub fn to_xml(&self) -> Result<String, quick_xml::SeError> {
        quick_xml::se::to_string_with_root("soap:Fault", self)
    }

    /// Parse a `Fault` element
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_str(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let fault = SoapFault::client("missing ticker");
        assert_eq!(fault.code, "soap:Client");
        assert_eq!(fault.to_string(), "soap:Client: missing ticker");

        let fault = SoapFault::server("backend down").with_detail("timeout").with_actor("urn:quotes");
        assert_eq!(fault.code, SoapFault::SERVER);
        assert_eq!(fault.detail.as_deref(), Some("timeout"));
        assert_eq!(fault.actor.as_deref(), Some("urn:quotes"));
    }

    #[test]
    fn test_xml() {
        let xml = SoapFault::client("bad request").to_xml().unwrap();
        assert_eq!(
            xml,
            "<soap:Fault><faultcode>soap:Client</faultcode><faultstring>bad request</faultstring></soap:Fault>"
        );

        let parsed = SoapFault::from_xml(
            "<Fault><faultcode>soap:Server</faultcode><faultstring>oops</faultstring><detail>db</detail></Fault>",
        )
        .unwrap();
        assert_eq!(parsed, SoapFault::server("oops").with_detail("db"));
    }
}
