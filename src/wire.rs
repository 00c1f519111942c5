use url::form_urlencoded;

use crate::FormFields;

/// Response text the server returns for a successful read.
pub const READ_SUCCESS: &str = "Success";

/// Returned by create and update when the transport reports failure.
pub const FAILURE: &str = "None";

/// Separates payload from operation tag in an update body.
pub const UPDATE_DELIMITER: char = '^';

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const UPDATE_CONTENT_TYPE: &str = "application/octet-stream";

/// Encodes create fields as an `application/x-www-form-urlencoded` body.
pub fn encode_form(fields: &FormFields) -> Vec<u8> {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in fields.iter() {
        serializer.append_pair(name, value);
    }
    serializer.finish().into_bytes()
}

/// Builds the update body: UTF-8 bytes of `"<payload>^<operation_tag>"`.
pub fn encode_update(payload: &str, operation_tag: &str) -> Vec<u8> {
    let mut body = String::with_capacity(payload.len() + operation_tag.len() + 1);
    body.push_str(payload);
    body.push(UPDATE_DELIMITER);
    body.push_str(operation_tag);
    body.into_bytes()
}
