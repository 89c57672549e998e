//! Integration test for the Dynamic Client (§10.5): stands up a mock WSDL +
//! SOAP endpoint over real HTTP and drives the full
//! WSDL-fetch -> analyze -> call round trip through [`DynamicClient`].

#![cfg(feature = "client")]

use soap_toolkit::client::{ClientOptions, DynamicClient};
use soap_toolkit::dispatcher::{CallOptions, ParamValue};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn calculator_wsdl(base_url: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
        <definitions name="CalculatorService"
            targetNamespace="urn:calc"
            xmlns:tns="urn:calc"
            xmlns:xsd="http://www.w3.org/2001/XMLSchema"
            xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
            xmlns="http://schemas.xmlsoap.org/wsdl/">
          <types>
            <xsd:schema targetNamespace="urn:calc">
              <xsd:element name="Add">
                <xsd:complexType>
                  <xsd:sequence>
                    <xsd:element name="a" type="xsd:decimal"/>
                    <xsd:element name="b" type="xsd:decimal"/>
                  </xsd:sequence>
                </xsd:complexType>
              </xsd:element>
              <xsd:element name="AddResponse">
                <xsd:complexType>
                  <xsd:sequence>
                    <xsd:element name="result" type="xsd:decimal"/>
                  </xsd:sequence>
                </xsd:complexType>
              </xsd:element>
            </xsd:schema>
          </types>
          <message name="AddRequest"><part name="parameters" element="tns:Add"/></message>
          <message name="AddResponse"><part name="parameters" element="tns:AddResponse"/></message>
          <portType name="CalculatorPortType">
            <operation name="Add">
              <input message="tns:AddRequest"/>
              <output message="tns:AddResponse"/>
            </operation>
          </portType>
          <binding name="CalculatorBinding" type="tns:CalculatorPortType">
            <soap:binding transport="http://schemas.xmlsoap.org/soap/http" style="document"/>
            <operation name="Add">
              <soap:operation soapAction="urn:calc#Add"/>
              <input><soap:body use="literal"/></input>
              <output><soap:body use="literal"/></output>
            </operation>
          </binding>
          <service name="CalculatorService">
            <port name="CalculatorPort" binding="tns:CalculatorBinding">
              <soap:address location="{base_url}/calc"/>
            </port>
          </service>
        </definitions>"#
    )
}

const ADD_RESPONSE_ENVELOPE: &str = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <tns:AddResponse xmlns:tns="urn:calc"><result>15</result></tns:AddResponse>
  </soap:Body>
</soap:Envelope>"#;

/// Drives `DynamicClient::new` (WSDL fetch + analysis) and `call` (envelope
/// build + POST + response unwrap) against a mock server, over the crate's
/// real blocking HTTP transport rather than a fake [`Transport`].
#[test]
fn dynamic_client_completes_wsdl_to_call_round_trip() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    let server = rt.block_on(MockServer::start());
    let base_url = server.uri();

    rt.block_on(async {
        Mock::given(method("GET"))
            .and(path("/calc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(calculator_wsdl(&base_url))
                    .insert_header("content-type", "text/xml"),
            )
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/calc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(ADD_RESPONSE_ENVELOPE)
                    .insert_header("content-type", "text/xml; charset=utf-8"),
            )
            .mount(&server)
            .await;
    });

    let wsdl_url = format!("{base_url}/calc?wsdl");
    let client = DynamicClient::new(&wsdl_url, ClientOptions::default())
        .expect("WSDL fetch and analysis should succeed against the mock server");

    let info = client.get_service_info();
    assert_eq!(info.service_name, "CalculatorService");
    assert_eq!(info.operations, vec!["Add".to_string()]);

    let params = ParamValue::tree()
        .with("a", ParamValue::decimal(10.0))
        .with("b", ParamValue::decimal(5.0));
    let result = client
        .call("Add", &params, &CallOptions::default())
        .expect("call against the mock SOAP endpoint should succeed");

    assert_eq!(
        result.child_by_local_name("result").and_then(|v| v.as_text()),
        Some("15")
    );

    drop(rt);
}
