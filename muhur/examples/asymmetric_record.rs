//! Record encryption with fresh wrapping and signing keys.
//!
//! For ease of the example, new random keys are generated every run.
//! Production callers would load persisted material, for instance via
//! `muhur-key-file`.

use muhur::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let table_name = std::env::args().nth(1).unwrap_or_else(|| "ExampleTable".to_string());

    // Provider configuration. All of this is thread-safe and can be
    // reused across calls.
    let provider = WrappedMaterialsProvider::generate();
    let encryptor = RecordEncryptor::new(provider, ContentCipher::default());

    // Information about the context of our data: the table and its
    // primary-key attribute names.
    let partition_key_name = "partition_attribute";
    let sort_key_name = "sort_attribute";
    let context =
        EncryptionContext::new(&table_name, partition_key_name).with_sort_key(sort_key_name);

    // Sample record to be encrypted
    let mut record = Record::new();
    record.insert(partition_key_name.to_string(), AttributeValue::string("is this"));
    record.insert(sort_key_name.to_string(), AttributeValue::number(55));
    record.insert("example".to_string(), AttributeValue::string("data"));
    record.insert("some numbers".to_string(), AttributeValue::number(99));
    record.insert("and some binary".to_string(), AttributeValue::binary(vec![0x00, 0x01, 0x02]));
    record.insert("leave me".to_string(), AttributeValue::string("alone"));

    // Describe what to do with each attribute. Partition and sort keys
    // must not be encrypted but should be signed; "leave me" is neither
    // signed nor encrypted; everything else is encrypted and signed.
    let actions = AttributeActions::new()
        .with_default(AttributeAction::EncryptAndSign)
        .with_attribute(partition_key_name, AttributeAction::SignOnly)
        .with_attribute(sort_key_name, AttributeAction::SignOnly)
        .with_attribute("leave me", AttributeAction::DoNothing);

    println!("Plaintext record: {record:#?}\n");

    let encrypted = encryptor.encrypt_record(&record, &actions, &context)?;
    println!("Encrypted record: {encrypted:#?}\n");

    // We could now store the encrypted record in the backing store just
    // as we would any other record. Decryption is identical in shape.
    let decrypted = encryptor.decrypt_record(&encrypted, &actions, &context)?;
    println!("Decrypted record: {decrypted:#?}");

    assert_eq!(decrypted, record);
    Ok(())
}
