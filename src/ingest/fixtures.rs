/// Test fixtures: representative NGSI-LD payloads from the context broker.
///
/// All payloads are `options=keyValues` responses from
///   {broker}/ngsi-ld/v1/entities?type=...
///
/// Beach shape:
///   id, name, source (service guide id)
///   beachType / seeAlso — array of strings, or a single bare string
///   location            — GeoJSON geometry, usually MultiPolygon
///
/// WaterQualityObserved shape:
///   dateObserved — `{"@type": "DateTime", "@value": "<RFC 3339>"}`
///   source       — provider URL or device URN
///   temperature  — °C, absent when the entity only carries other measures

/// Two beaches: Aspholmen (MultiPolygon, array fields) and Ängholmsbadet
/// (Point, bare-string fields).
#[cfg(test)]
pub(crate) fn fixture_beaches_json() -> &'static str {
    r#"[
      {
        "@context": "https://raw.githubusercontent.com/diwise/context-broker/main/assets/jsonldcontexts/default-context.jsonld",
        "id": "urn:ngsi-ld:Beach:SE0A21480000004452",
        "type": "Beach",
        "areaServed": "Långedrag",
        "dataProvider": "ServiceGuiden",
        "name": "Aspholmen (Saltholmen)",
        "source": "61e0a246cfc4d247cca9604c",
        "beachType": ["Hund tillåtet", "Hav"],
        "seeAlso": [
          "https://goteborg.se/wps/portal/start/kultur-och-fritid/fritid-och-natur/friluftsliv-natur-och/badplatser--utomhusbad/badplatser-utomhusbad/?id=3710",
          "https://badplatsen.havochvatten.se/badplatsen/api/testlocationprofile/SE0A21480000004452"
        ],
        "location": {
          "type": "MultiPolygon",
          "coordinates": [[[[11.837656, 57.658862], [11.837656, 57.658962], [11.837756, 57.658962], [11.837656, 57.658862]]]]
        }
      },
      {
        "id": "urn:ngsi-ld:Beach:SE0A21480000000471",
        "type": "Beach",
        "name": "Ängholmsbadet",
        "source": "61e0a246cfc4d247cca96a11",
        "beachType": "Sjö",
        "seeAlso": "https://goteborg.se/wps/portal?id=4120",
        "location": { "type": "Point", "coordinates": [12.0301, 57.7612] }
      }
    ]"#
}

/// A beach whose location is missing and whose list fields are malformed.
/// Parsing should still succeed; the beach simply has no anchor point.
#[cfg(test)]
pub(crate) fn fixture_beach_without_location_json() -> &'static str {
    r#"[
      {
        "id": "urn:ngsi-ld:Beach:SE0A21480000009999",
        "type": "Beach",
        "name": "Okänd strand",
        "source": "61e0a246cfc4d247cca9ffff",
        "beachType": 7,
        "location": { "type": "LineString", "coordinates": [[11.9, 57.6], [11.91, 57.61]] }
      }
    ]"#
}

/// Observations near Aspholmen: one per source category, one entity
/// without a temperature, and one with a bare-string date.
#[cfg(test)]
pub(crate) fn fixture_water_quality_json() -> &'static str {
    r#"[
      {
        "id": "urn:ngsi-ld:WaterQualityObserved:SE0A21480000000532:2022-06-27T17:00:00+02:00",
        "type": "WaterQualityObserved",
        "dateObserved": { "@type": "DateTime", "@value": "2022-06-27T17:00:00+02:00" },
        "source": "https://www.smhi.se/",
        "temperature": 18.8,
        "location": { "type": "Point", "coordinates": [11.924098, 57.623416] }
      },
      {
        "id": "urn:ngsi-ld:WaterQualityObserved:SE0A21480000004452:2022-06-26T09:30:00Z",
        "type": "WaterQualityObserved",
        "dateObserved": { "@type": "DateTime", "@value": "2022-06-26T09:30:00Z" },
        "source": "https://badplatsen.havochvatten.se/badplatsen/api",
        "temperature": 16.0
      },
      {
        "id": "urn:ngsi-ld:WaterQualityObserved:temp:se:servanet:lora:sk-elt-temp-16:2022-06-27T14:45:00Z",
        "type": "WaterQualityObserved",
        "dateObserved": { "@type": "DateTime", "@value": "2022-06-27T14:45:00Z" },
        "source": "",
        "temperature": 19.4
      },
      {
        "id": "urn:ngsi-ld:WaterQualityObserved:ph-only",
        "type": "WaterQualityObserved",
        "dateObserved": { "@type": "DateTime", "@value": "2022-06-27T14:00:00Z" },
        "source": "https://www.smhi.se/",
        "pH": 7.9
      },
      {
        "id": "urn:ngsi-ld:WaterQualityObserved:plain-date",
        "type": "WaterQualityObserved",
        "dateObserved": "2022-06-27T12:00:00Z",
        "source": "urn:ngsi-ld:Device:se:servanet:lora:sk-elt-temp-02",
        "temperature": 19.0
      }
    ]"#
}
