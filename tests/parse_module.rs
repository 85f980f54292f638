mod common;

use common::{put_u32, three_voice_tune, ModuleBuilder};
use hippel_coso::coso_parser::{sniff, Container, FormatParser};
use hippel_coso::module::{EnvelopeCommand, InstrumentCommand, PatternCommand};
use hippel_coso::{
    load_file, load_module, CosoError, DataReader, ModuleLoader, SliceReader, Variant,
};

fn parse(data: &[u8]) -> hippel_coso::Result<hippel_coso::Module> {
    load_module(&mut SliceReader::new(data))
}

#[test]
fn parses_bare_mmme_tables() {
    let module = parse(&three_voice_tune().build()).unwrap();

    assert_eq!(module.variant(), Variant::Mmme);
    assert_eq!(module.voice_count(), 3);
    assert_eq!(module.instruments().len(), 2);
    assert_eq!(module.timbres().len(), 2);
    assert_eq!(module.patterns().len(), 1);
    assert_eq!(module.divisions().len(), 3);
    assert_eq!(module.songs().len(), 1);

    assert_eq!(
        module.instruments()[0].commands(),
        &[
            InstrumentCommand::EnableToneDisableNoise,
            InstrumentCommand::Complete
        ]
    );
    assert_eq!(module.timbres()[1].instrument, 1);
    assert_eq!(
        module.timbres()[0].envelope.commands(),
        &[EnvelopeCommand::SetVolume(0x30), EnvelopeCommand::Hold]
    );
    assert_eq!(
        module.patterns()[0].commands(),
        &[
            PatternCommand::SetSpeed(4),
            PatternCommand::SetNote {
                note: 0x18,
                timbre_adjust: Some(0),
                instrument: None
            },
            PatternCommand::EndPattern,
        ]
    );
    assert_eq!(module.divisions()[0].channels[1].timbre_index, 1);

    let song = module.song(0).unwrap();
    assert_eq!(song.start_division, 0);
    assert_eq!(song.end_division, 3);
    assert_eq!(song.initial_speed, 1);
}

#[test]
fn coso_wrapper_routes_to_payload() {
    let data = ModuleBuilder::coso(b"TFMX", 3)
        .instrument(&[0xe1])
        .timbre(1, 0, &[0xe1])
        .pattern(&[0xff])
        .division(&[[0, 0, 0, 0]; 3])
        .song(0, 1, 1)
        .samples(2)
        .build();

    let header = sniff(&mut SliceReader::new(&data)).unwrap();
    assert_eq!(header.container, Container::Coso);
    assert_eq!(header.variant, Variant::Tfmx);

    let summary = parse(&data).unwrap().summary();
    assert_eq!(summary.variant, Variant::Tfmx);
    assert_eq!(summary.samples, 2);
    assert_eq!(summary.bytes_per_monopattern, 0x40);
}

#[test]
fn parses_at_reader_position() {
    let mut data = vec![0xaa; 6];
    data.extend(three_voice_tune().build());

    let mut reader = SliceReader::new(&data);
    reader.set_position(6);
    let module = load_module(&mut reader).unwrap();
    assert_eq!(module.divisions().len(), 3);
}

#[test]
fn unknown_tag_is_rejected() {
    let mut data = three_voice_tune().build();
    data[0..4].copy_from_slice(b"ABCD");
    assert!(matches!(
        parse(&data),
        Err(CosoError::UnknownTag { tag }) if &tag == b"ABCD"
    ));
}

#[test]
fn lsmp_is_rejected() {
    let mut data = three_voice_tune().build();
    data[0x1c..0x20].copy_from_slice(b"LSMP");
    assert!(matches!(parse(&data), Err(CosoError::UnsupportedLsmp)));
}

#[test]
fn bare_tfmx_header_checks() {
    let data = ModuleBuilder::tfmx(3)
        .instrument(&[0xe1])
        .timbre(1, 0, &[0xe1])
        .pattern(&[0xff])
        .division(&[[0, 0, 0, 0]; 3])
        .song(0, 1, 1)
        .build();
    // the division offset is small, so its high word is zero
    assert!(matches!(
        parse(&data),
        Err(CosoError::InvalidHeader { format: "TFMX", .. })
    ));
}

#[test]
fn coso_without_songs_is_rejected() {
    let mut data = ModuleBuilder::coso(b"MMME", 3)
        .instrument(&[0xe1])
        .timbre(1, 0, &[0xe1])
        .pattern(&[0xff])
        .division(&[[0, 0, 0, 0]; 3])
        .song(0, 1, 1)
        .build();
    data[0x30] = 0;
    data[0x31] = 0;
    assert!(matches!(
        parse(&data),
        Err(CosoError::InvalidHeader { format: "COSO", .. })
    ));
}

#[test]
fn total_size_must_match_sample_table() {
    let mut data = three_voice_tune().build();
    let total = data.len() as u32;
    put_u32(&mut data, 0x1c, total + 6);
    assert!(matches!(
        parse(&data),
        Err(CosoError::SizeMismatch { expected, actual })
            if expected == total as usize + 6 && actual == total as usize
    ));
}

#[test]
fn envelope_loop_targets_commands() {
    let data = ModuleBuilder::mmme(1)
        .instrument(&[0xe1])
        // volume 0x40, volume 0x30, filler, sustain 2, loop to byte 6 (volume 0x30)
        .raw_timbre(&[1, 0, 0, 0, 0, 0x40, 0x30, 0xe2, 0xe8, 0x02, 0xe0, 0x06])
        .pattern(&[0xff])
        .division(&[[0, 0, 0, 0]])
        .song(0, 1, 1)
        .build();

    let module = ModuleLoader::new().voice_count(1).parse(&data).unwrap();
    assert_eq!(
        module.timbres()[0].envelope.commands(),
        &[
            EnvelopeCommand::SetVolume(0x40),
            EnvelopeCommand::SetVolume(0x30),
            EnvelopeCommand::Sustain(2),
            EnvelopeCommand::Loop(1),
        ]
    );
}

#[test]
fn instrument_loop_and_note_info() {
    let data = ModuleBuilder::mmme(1)
        .instrument(&[0xe6, 0x0c, 0xe8, 0x02, 0x10, 0xe0, 0x01])
        .instrument(&[0xe1])
        .timbre(1, 0, &[0xe1])
        .timbre(1, 1, &[0xe1])
        // note with timbre adjust + instrument, note with instrument only,
        // note where bit 6 cancels the instrument
        .pattern(&[0x20, 0x21, 0x01, 0x22, 0xa0, 0x01, 0x23, 0x41, 0x01, 0xff])
        .division(&[[0, 0, 0, 0]])
        .song(0, 1, 1)
        .build();

    let module = ModuleLoader::new().voice_count(1).parse(&data).unwrap();
    assert_eq!(
        module.instruments()[0].commands(),
        &[
            InstrumentCommand::EnableToneDisableNoise,
            InstrumentCommand::SetPitch(0x0c),
            InstrumentCommand::Delay(2),
            InstrumentCommand::SetPitch(0x10),
            InstrumentCommand::Loop(1),
        ]
    );
    assert_eq!(
        module.patterns()[0].commands(),
        &[
            PatternCommand::SetNote {
                note: 0x20,
                timbre_adjust: Some(1),
                instrument: Some(1)
            },
            PatternCommand::SetNote {
                note: 0x22,
                timbre_adjust: None,
                instrument: Some(1)
            },
            PatternCommand::SetNote {
                note: 0x23,
                timbre_adjust: Some(1),
                instrument: None
            },
            PatternCommand::EndPattern,
        ]
    );
}

#[test]
fn undefined_instrument_opcode_is_rejected() {
    let data = ModuleBuilder::mmme(1)
        .instrument(&[0x0c, 0xed])
        .timbre(1, 0, &[0xe1])
        .pattern(&[0xff])
        .division(&[[0, 0, 0, 0]])
        .song(0, 1, 1)
        .build();

    let err = ModuleLoader::new().voice_count(1).parse(&data).unwrap_err();
    assert!(err.is_format_error());
    assert!(matches!(
        err,
        CosoError::InvalidCommand {
            program: "instrument",
            entry: 0,
            offset: 1,
            opcode: 0xed
        }
    ));
}

#[test]
fn dangling_timbre_reference_is_rejected() {
    let data = ModuleBuilder::mmme(1)
        .instrument(&[0xe7, 0x05])
        .timbre(1, 0, &[0xe1])
        .pattern(&[0xff])
        .division(&[[0, 0, 0, 0]])
        .song(0, 1, 1)
        .build();

    assert!(matches!(
        ModuleLoader::new().voice_count(1).parse(&data),
        Err(CosoError::IndexOutOfRange {
            kind: "timbre",
            index: 5,
            count: 1
        })
    ));
}

#[test]
fn load_file_skips_leading_stub() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tune.mus");
    let mut data = vec![0x60, 0x00, 0x00, 0x20];
    data.extend(three_voice_tune().build());
    std::fs::write(&path, &data).unwrap();

    let module = load_file(&path).unwrap();
    assert_eq!(module.variant(), Variant::Mmme);
    assert_eq!(module.songs().len(), 1);
}
