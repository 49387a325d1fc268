slotmap::new_key_type! { pub struct ModelHandle; }
slotmap::new_key_type! { pub struct MaterialHandle; }
