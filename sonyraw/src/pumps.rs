use crate::bits::read_bits;

/// Sequential MSB-first bit reader.
///
/// Reading past the end of the buffer yields zero bits, callers
/// must check the buffer size if that matters.
#[derive(Debug, Copy, Clone)]
pub struct BitPumpMSB<'a> {
  buffer: &'a [u8],
  pos: usize,
}

impl<'a> BitPumpMSB<'a> {
  pub fn new(src: &'a [u8]) -> BitPumpMSB<'a> {
    BitPumpMSB { buffer: src, pos: 0 }
  }

  /// Number of bits consumed so far
  #[inline(always)]
  pub fn bit_pos(&self) -> usize {
    self.pos
  }
}

pub trait BitPump {
  fn peek_bits(&mut self, num: u32) -> u32;
  fn consume_bits(&mut self, num: u32);

  #[inline(always)]
  fn get_bits(&mut self, num: u32) -> u32 {
    if num == 0 {
      return 0;
    }

    let val = self.peek_bits(num);
    self.consume_bits(num);

    val
  }
}

impl<'a> BitPump for BitPumpMSB<'a> {
  #[inline(always)]
  fn peek_bits(&mut self, num: u32) -> u32 {
    match read_bits(self.buffer, self.pos, num) {
      Some(val) => val,
      None => {
        let avail = (self.buffer.len() * 8).saturating_sub(self.pos).min(num as usize) as u32;
        let head = read_bits(self.buffer, self.pos, avail).unwrap_or(0);
        head.checked_shl(num - avail).unwrap_or(0)
      }
    }
  }

  #[inline(always)]
  fn consume_bits(&mut self, num: u32) {
    self.pos += num as usize;
  }
}
