// Plain string errors, for layers that only ever report a message.
pub type SError = String;
