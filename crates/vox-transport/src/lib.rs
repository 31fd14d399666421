//! Duplex transport adapter (spec §4.9, §6): frame serialization, WAV
//! framing, single-writer discipline, and inbound routing into the VAD
//! input queue.

pub mod serializer;
pub mod sink;
pub mod transport;
pub mod wav;

pub use serializer::{FrameSerializer, JsonSerializer};
pub use sink::{MessageKind, MessageSink, MessageSource};
pub use transport::{Transport, TransportConfig};
pub use wav::wrap_wav;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use vox_audio_output::TransportWriter;
    use vox_foundation::error::VoxError;
    use vox_frames::{ControlFrame, DataFrame, Frame, Text};
    use vox_pipeline::context::channel;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(MessageKind, Vec<u8>)>>,
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn send(&self, kind: MessageKind, payload: Vec<u8>) -> Result<(), VoxError> {
            self.sent.lock().await.push((kind, payload));
            Ok(())
        }
    }

    struct ScriptedSource {
        messages: std::vec::IntoIter<(MessageKind, Vec<u8>)>,
    }

    #[async_trait]
    impl MessageSource for ScriptedSource {
        async fn recv(&mut self) -> Result<Option<(MessageKind, Vec<u8>)>, VoxError> {
            Ok(self.messages.next())
        }
    }

    fn transport(sink: RecordingSink, frame_size: usize) -> Transport<RecordingSink> {
        Transport::new(
            sink,
            Arc::new(JsonSerializer),
            TransportConfig {
                audio_out_frame_size: frame_size,
                ..TransportConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn write_raw_audio_emits_one_frame_per_configured_chunk() {
        let transport = transport(RecordingSink::default(), 4);
        transport.write_raw_audio(&[1, 2, 3, 4, 5, 6]).await.unwrap();

        let sent = transport.sink.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, MessageKind::Binary);
    }

    #[tokio::test]
    async fn write_raw_audio_wav_wraps_when_configured() {
        let transport = Transport::new(
            RecordingSink::default(),
            Arc::new(JsonSerializer),
            TransportConfig {
                audio_out_frame_size: 4,
                audio_out_add_wav_header: true,
                ..TransportConfig::default()
            },
        );
        transport.write_raw_audio(&[9, 9, 9, 9]).await.unwrap();

        let sent = transport.sink.sent.lock().await;
        assert_eq!(sent.len(), 1);
        let frame: Frame = serde_json::from_slice(&sent[0].1).unwrap();
        match frame {
            Frame::Data(DataFrame::AudioRaw(audio)) => {
                assert_eq!(audio.bytes.len(), 44 + 4);
                assert_eq!(&audio.bytes[0..4], b"RIFF");
            }
            other => panic!("expected AudioRaw, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn write_frame_ignores_kinds_outside_the_direct_set() {
        let transport = transport(RecordingSink::default(), 640);
        transport
            .write_frame(&Frame::Data(DataFrame::ThinkText(vox_frames::ThinkText {
                text: "...".into(),
            })))
            .await
            .unwrap();

        assert!(transport.sink.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn write_frame_sends_text_and_start_interruption_directly() {
        let transport = transport(RecordingSink::default(), 640);
        transport
            .write_frame(&Frame::Data(DataFrame::Text(Text { utf8: "hi".into() })))
            .await
            .unwrap();
        transport
            .write_frame(&Frame::Control(ControlFrame::StartInterruption))
            .await
            .unwrap();

        assert_eq!(transport.sink.sent.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn read_loop_routes_audio_raw_into_vad_input_and_drops_other_kinds() {
        let transport = transport(RecordingSink::default(), 640);
        let serializer = JsonSerializer;
        let audio = Frame::Data(DataFrame::AudioRaw(vox_frames::AudioRaw::new(
            vec![1, 2, 3, 4],
            16_000,
            1,
            2,
        )));
        let text = Frame::Data(DataFrame::Text(Text { utf8: "ignored".into() }));

        let source = ScriptedSource {
            messages: vec![
                (MessageKind::Binary, serializer.serialize(&audio).unwrap()),
                (MessageKind::Binary, serializer.serialize(&text).unwrap()),
                (MessageKind::Text, b"{}".to_vec()),
            ]
            .into_iter(),
        };

        let (vad_inlet, mut vad_rx) = channel(8);
        transport.read_loop(source, vad_inlet).await.unwrap();

        let (envelope, direction) = vad_rx.try_recv().expect("audio frame routed");
        assert!(matches!(envelope.payload, Frame::Data(DataFrame::AudioRaw(_))));
        assert_eq!(direction, vox_pipeline::Direction::Downstream);
        assert!(vad_rx.try_recv().is_err());
    }
}
