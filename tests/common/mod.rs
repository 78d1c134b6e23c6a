//! Gemeinsame Beispieldokumente fuer die Integrationstests.

#![allow(dead_code)]

pub const SOAP_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SERVICE_NS: &str = "http://www.oraycn.com/";

/// SOAP envelope whose payload lives in a second namespace.
pub const SOAP_RESPONSE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- captured response -->
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema">
  <soap:Body>
    <CheckAuthorizedUserResponse xmlns="http://www.oraycn.com/">
      <CheckAuthorizedUserResult>true</CheckAuthorizedUserResult>
    </CheckAuthorizedUserResponse>
  </soap:Body>
</soap:Envelope>"#;

pub const CROSS_DOMAIN_POLICY: &str = r#"<cross-domain-policy>
    <allow-access-from domain="*.example.com" secure="false"/>
</cross-domain-policy>"#;

pub const METHOD_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<methodResponse>
  <fault>
    <value>
      <struct>
        <member>
          <name>faultCode</name>
          <value><int>403</int></value>
        </member>
        <member>
          <name>faultString</name>
          <value><string>Your IP has been flagged.</string></value>
        </member>
      </struct>
    </value>
  </fault>
</methodResponse>"#;

pub const SIMPLE_LETTER: &str = "<letter>\n    Hi, Dear Mr.\n</letter>";

pub const FOOD: &str = "<food type=\"dessert\">\n    Ice cream\n</food>";

pub const ORDER_LETTER: &str = r#"<letter>
    <name>John Smith</name>
    <orderid>1032</orderid>
    <shipdate>2001-07-13</shipdate>
</letter>"#;

pub const MIXED_LETTER: &str = r#"<letter>
    Dear Mr.<name>John Smith</name>.
    Your order <orderid>1032</orderid>
    will be shipped on <shipdate>2001-07-13</shipdate>.
</letter>"#;

pub const PERSON: &str = r#"<Person>
    <shoesize country="france">35</shoesize>
    <FullName>Grace R. Emlin</FullName>
    <Company>Example Inc.</Company>
    <Email where="home">
        <Addr>gre@example.com</Addr>
    </Email>
    <Email where='work'>
        <Addr>gre@work.com</Addr>
    </Email>
    <Group>
        <Value>Friends</Value>
        <Value>Squash</Value>
    </Group>
    <City>Hanga Roa</City>
    <State>Easter Island</State>
</Person>"#;

pub const USERS: &str = r#"<person>
<user>
  <firstname></firstname>
  <lastname></lastname>
</user>
<user>
  <firstname></firstname>
  <midlename></midlename>
</user>
<user>
  <firstname></firstname>
  <lastname></lastname>
  <midlename></midlename>
</user>
</person>"#;

/// Namespaces alternate outer → inner → outer, and inner recurs.
pub const ALTERNATING: &str = r#"<a xmlns="urn:outer">
  <b xmlns="urn:inner"><c xmlns="urn:outer">x</c></b>
  <d xmlns="urn:third"/>
  <b xmlns="urn:inner"><e/></b>
</a>"#;

pub const ALL: [(&str, &str); 10] = [
    ("soap", SOAP_RESPONSE),
    ("cross-domain-policy", CROSS_DOMAIN_POLICY),
    ("methodResponse", METHOD_RESPONSE),
    ("simple letter", SIMPLE_LETTER),
    ("food", FOOD),
    ("order letter", ORDER_LETTER),
    ("mixed letter", MIXED_LETTER),
    ("person", PERSON),
    ("users", USERS),
    ("alternating", ALTERNATING),
];
